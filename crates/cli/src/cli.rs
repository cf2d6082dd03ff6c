use clap::{Args, Parser, Subcommand};
use indexmap::IndexSet;
use tracity_core::{Breadth, ChartType, Facet};

/// Terminal client for the TRACITY dashboard.
///
/// Browses public datasets and uploaded files, applies filters and prints
/// the resulting rows together with their insights.
#[derive(Parser, Debug)]
#[command(name = "tracity", about = "Filter-driven data exploration for TRACITY")]
pub struct CliArgs {
    /// Backend base URL (overrides env var and config file)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Path to config file (default: ~/.config/tracity/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List public datasets in display order
    Datasets,

    /// List the signed-in user's uploaded files
    Files,

    /// Show platform counters
    Stats,

    /// Sign in and persist the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "TRACITY_PASSWORD", hide_env_values = true)]
        password: String,

        /// Answer to the captcha challenge (prompted when omitted)
        #[arg(long)]
        captcha_answer: Option<i64>,
    },

    /// Sign out and forget the persisted session
    Logout,

    /// Upload a CSV or JSON file (max 10MB)
    Upload { path: std::path::PathBuf },

    /// Activate a source, apply filters and print the result
    Explore(ExploreArgs),
}

#[derive(Args, Debug, Clone, Default)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["dataset", "file"])))]
pub struct ExploreArgs {
    /// Public dataset collection, e.g. crimes
    #[arg(long)]
    pub dataset: Option<String>,

    /// Uploaded file id
    #[arg(long)]
    pub file: Option<String>,

    /// States to keep (repeatable or comma-separated)
    #[arg(long = "state", value_delimiter = ',')]
    pub states: Vec<String>,

    /// Years to keep (repeatable or comma-separated)
    #[arg(long = "year", value_delimiter = ',')]
    pub years: Vec<i32>,

    /// Crime categories to keep (public datasets only)
    #[arg(long = "category", value_delimiter = ',')]
    pub categories: Vec<String>,

    /// Request the full row limit instead of the default page
    #[arg(long)]
    pub all_states: bool,

    /// Field to sort by
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Chart to render: bar, line, pie or doughnut
    #[arg(long)]
    pub chart: Option<ChartType>,

    /// Split series by year
    #[arg(long)]
    pub by_year: bool,
}

impl ExploreArgs {
    /// Whether a selection or sort was requested. Breadth alone keeps the
    /// unfiltered view.
    pub fn has_filters(&self) -> bool {
        !self.states.is_empty()
            || !self.years.is_empty()
            || !self.categories.is_empty()
            || self.sort_by.is_some()
    }

    pub fn breadth(&self) -> Breadth {
        if self.all_states {
            Breadth::Full
        } else {
            Breadth::Narrow
        }
    }

    /// Requested facets in the order given, repeats dropped.
    pub fn facets(&self, with_categories: bool) -> IndexSet<Facet> {
        let mut facets: IndexSet<Facet> = self.states.iter().cloned().map(Facet::State).collect();
        facets.extend(self.years.iter().copied().map(Facet::Year));
        if with_categories {
            facets.extend(self.categories.iter().cloned().map(Facet::Category));
        }
        facets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explore_parses_facets() {
        let args = CliArgs::parse_from([
            "tracity", "explore", "--dataset", "crimes", "--state", "Texas,Ohio", "--year", "2020",
            "--year", "2021", "--chart", "line",
        ]);
        let Command::Explore(explore) = args.command else {
            panic!("expected explore");
        };
        assert_eq!(explore.dataset.as_deref(), Some("crimes"));
        assert_eq!(explore.states, vec!["Texas", "Ohio"]);
        assert_eq!(explore.years, vec![2020, 2021]);
        assert_eq!(explore.chart, Some(ChartType::Line));
        assert!(explore.has_filters());
    }

    #[test]
    fn test_explore_requires_a_source() {
        assert!(CliArgs::try_parse_from(["tracity", "explore"]).is_err());
        assert!(CliArgs::try_parse_from(["tracity", "explore", "--dataset", "aqi", "--file", "f-1"]).is_err());
    }

    #[test]
    fn test_facets_keep_given_order() {
        let args = CliArgs::parse_from([
            "tracity", "explore", "--dataset", "crimes", "--state", "Punjab,Kerala,Punjab", "--year",
            "2020", "--category", "Theft",
        ]);
        let Command::Explore(explore) = args.command else {
            panic!("expected explore");
        };
        let facets: Vec<Facet> = explore.facets(true).into_iter().collect();
        assert_eq!(
            facets,
            vec![
                Facet::State("Punjab".into()),
                Facet::State("Kerala".into()),
                Facet::Year(2020),
                Facet::Category("Theft".into()),
            ]
        );
        assert_eq!(explore.facets(false).len(), 3);
    }

    #[test]
    fn test_all_states_alone_stays_unfiltered() {
        let args = CliArgs::parse_from(["tracity", "explore", "--dataset", "crimes", "--all-states"]);
        let Command::Explore(explore) = args.command else {
            panic!("expected explore");
        };
        assert!(!explore.has_filters());
        assert_eq!(explore.breadth(), Breadth::Full);
    }

    #[test]
    fn test_chart_only_is_not_a_filter() {
        let args = CliArgs::parse_from(["tracity", "--json", "explore", "--file", "f-1", "--chart", "pie"]);
        assert!(args.json);
        let Command::Explore(explore) = args.command else {
            panic!("expected explore");
        };
        assert!(!explore.has_filters());
    }
}
