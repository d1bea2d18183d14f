//! Fixture command-line construction.
use crate::config::RunConfig;

/// Positional script when no suite is selected.
pub const ALL_TESTS_SCRIPT: &str = "all.test";
/// Positional script that runs named permutations.
pub const PERMUTATIONS_SCRIPT: &str = "permutations.test";

/// Arguments passed to the fixture, in order.
pub type FixtureArgs = Vec<String>;

/// Translate run options into fixture arguments.
///
/// The positional script comes first: `all.test` for an empty suite,
/// otherwise `permutations.test` followed by the suite split on single
/// spaces. Then `-verbose=`, `-maxerror=` and `-start=` for whichever options
/// are set.
pub fn build_args(config: &RunConfig) -> FixtureArgs {
    let mut args = Vec::new();
    if config.suite.is_empty() {
        args.push(ALL_TESTS_SCRIPT.to_string());
    } else {
        args.push(PERMUTATIONS_SCRIPT.to_string());
        args.extend(config.suite.split(' ').map(str::to_string));
    }
    if !config.verbose.is_empty() {
        args.push(format!("-verbose={}", config.verbose));
    }
    if config.max_error != 0 {
        args.push(format!("-maxerror={}", config.max_error));
    }
    if !config.start.is_empty() {
        args.push(format!("-start={}", config.start));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(suite: &str, verbose: &str, max_error: u32, start: &str) -> RunConfig {
        RunConfig {
            suite: suite.to_string(),
            verbose: verbose.to_string(),
            max_error,
            start: start.to_string(),
        }
    }

    #[test]
    fn empty_suite_runs_all_tests() {
        assert_eq!(build_args(&config("", "", 0, "")), vec!["all.test"]);
    }

    #[test]
    fn default_options_forward_verbose_zero() {
        assert_eq!(
            build_args(&RunConfig::default()),
            vec!["all.test", "-verbose=0"]
        );
    }

    #[test]
    fn suite_selects_permutations() {
        assert_eq!(
            build_args(&config("perm1 extra", "", 0, "")),
            vec!["permutations.test", "perm1", "extra"]
        );
        assert_eq!(
            build_args(&config("full", "1", 0, "")),
            vec!["permutations.test", "full", "-verbose=1"]
        );
    }

    #[test]
    fn all_flags_follow_positional_in_fixed_order() {
        assert_eq!(
            build_args(&config("", "1", 5, "p:f.test")),
            vec!["all.test", "-verbose=1", "-maxerror=5", "-start=p:f.test"]
        );
    }

    #[test]
    fn split_is_on_single_spaces() {
        assert_eq!(
            build_args(&config("veryquick  select1.test", "", 0, "")),
            vec!["permutations.test", "veryquick", "", "select1.test"]
        );
    }

    #[test]
    fn build_args_is_deterministic() {
        let cfg = config("veryquick select1.test", "file", 10, "veryquick:select1.test");
        assert_eq!(build_args(&cfg), build_args(&cfg));
    }
}
