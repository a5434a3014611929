//! Unit tests for the `dnsscope` CLI binary implementation.

use super::*;
use crate::cli::parse_assignment;
use rstest::rstest;

fn config(provider: Option<&str>, lock_timeout_secs: Option<u64>) -> DnsScopeConfig {
    DnsScopeConfig {
        provider: provider.map(str::to_owned),
        lock_timeout_secs,
    }
}

#[rstest]
#[case("TOKEN=abc", ("TOKEN", "abc"))]
#[case("TOKEN=", ("TOKEN", ""))]
#[case("URL=http://x/?a=b", ("URL", "http://x/?a=b"))]
fn assignments_split_at_the_first_equals(#[case] raw: &str, #[case] expected: (&str, &str)) {
    assert_eq!(
        parse_assignment(raw),
        Ok((expected.0.to_owned(), expected.1.to_owned()))
    );
}

#[rstest]
#[case("TOKEN")]
#[case("=abc")]
fn malformed_assignments_are_rejected(#[case] raw: &str) {
    let err = parse_assignment(raw).expect_err("assignment should be rejected");
    assert!(err.contains("KEY=VALUE"), "error: {err}");
}

#[rstest]
#[case(Some("exec"), Some("httpreq"), "exec")]
#[case(None, Some("httpreq"), "httpreq")]
#[case(Some(" exec "), None, "exec")]
fn provider_flag_wins_over_config(
    #[case] flag: Option<&str>,
    #[case] configured: Option<&str>,
    #[case] expected: &str,
) {
    let selected = select_provider(flag, &config(configured, None)).expect("provider selected");
    assert_eq!(selected, expected);
}

#[rstest]
#[case(None)]
#[case(Some("  "))]
fn missing_provider_is_reported(#[case] flag: Option<&str>) {
    let err = select_provider(flag, &config(None, None)).expect_err("no provider");
    assert!(matches!(err, CliError::MissingProvider));
}

#[rstest]
fn lock_timeout_flag_wins_over_config() {
    let settings = config(None, Some(30));
    assert_eq!(
        select_lock_timeout(Some(2), &settings).expect("timeout"),
        Some(Duration::from_secs(2))
    );
    assert_eq!(
        select_lock_timeout(None, &settings).expect("timeout"),
        Some(Duration::from_secs(30))
    );
    assert!(matches!(
        select_lock_timeout(Some(0), &settings),
        Err(CliError::Config(_))
    ));
}

#[rstest]
fn list_providers_writes_one_name_per_line() {
    let mut buf = Vec::new();
    list_providers(&mut buf).expect("listing should succeed");
    let rendered = String::from_utf8(buf).expect("utf8");
    assert_eq!(rendered, "exec\nhttpreq\n");
}

#[rstest]
fn write_error_writes_cli_error() {
    let mut buf = Vec::new();
    let err = CliError::Provider(ProviderError::UnknownProvider {
        name: String::from("nope"),
    });
    write_error(&mut buf, &err);
    let rendered = String::from_utf8(buf).expect("utf8");
    assert_eq!(rendered, "unknown DNS provider 'nope'\n");
}
