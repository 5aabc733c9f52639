//! Launch parameters: the initial topic and mode
//!
//! On the web these come from the page query string (`?topic=...&mode=video`),
//! natively from the command line.

use crate::templates::Mode;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    pub topic: Option<String>,
    pub mode: Mode,
}

impl LaunchOptions {
    /// Parse a query string, with or without the leading `?`.
    /// Unknown modes fall back to channel planning.
    pub fn from_query(query: &str) -> Self {
        let mut options = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "topic" => {
                    let topic = value.trim();
                    if !topic.is_empty() {
                        options.topic = Some(topic.to_string());
                    }
                }
                "mode" => match Mode::from_id(&value) {
                    Some(mode) => options.mode = mode,
                    None => log::warn!("Ignoring unknown mode '{}'", value),
                },
                _ => {}
            }
        }
        options
    }

    /// Read from the page URL
    #[cfg(target_arch = "wasm32")]
    pub fn from_location() -> Self {
        let search = web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default();
        Self::from_query(&search)
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use cli::Cli;

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use clap::{Parser, ValueEnum};

    use super::LaunchOptions;
    use crate::templates::Mode;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    enum ModeArg {
        Channel,
        Video,
    }

    /// Node-based YouTube channel and video planner
    #[derive(Parser, Debug)]
    #[command(name = "channel-factory", version, about)]
    pub struct Cli {
        /// Topic seeded into the starting workflow
        #[arg(short, long)]
        topic: Option<String>,

        /// Planning mode to open
        #[arg(short, long, value_enum, default_value = "channel")]
        mode: ModeArg,
    }

    impl From<Cli> for LaunchOptions {
        fn from(cli: Cli) -> Self {
            Self {
                topic: cli.topic.filter(|t| !t.trim().is_empty()),
                mode: match cli.mode {
                    ModeArg::Channel => Mode::Channel,
                    ModeArg::Video => Mode::Video,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_is_decoded() {
        let options = LaunchOptions::from_query("?topic=urban+bee%20keeping&mode=video");
        assert_eq!(options.topic.as_deref(), Some("urban bee keeping"));
        assert_eq!(options.mode, Mode::Video);
    }

    #[test]
    fn missing_or_bad_values_use_defaults() {
        assert_eq!(LaunchOptions::from_query(""), LaunchOptions::default());
        let options = LaunchOptions::from_query("mode=podcast&topic=");
        assert_eq!(options.mode, Mode::Channel);
        assert_eq!(options.topic, None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn cli_flags_map_to_options() {
        use clap::Parser;
        let cli = Cli::try_parse_from(["channel-factory", "--topic", "solo camping", "--mode", "video"]).unwrap();
        let options = LaunchOptions::from(cli);
        assert_eq!(options.topic.as_deref(), Some("solo camping"));
        assert_eq!(options.mode, Mode::Video);
    }
}
