use std::collections::HashSet;
use std::time::Duration;

use formscrape_core::{ConfigError, Locator, LocatorKind, ScrapeConfig, TableSelection, Wait};

const DOCUMENT: &str = r#"(
    url: "https://example.com/odds",
    input_form_id: "search",
    form_schema: "forms.ron",
    form_inputs: {
        "q": (kind: "const", value: "hello"),
        "sort": (kind: "all"),
        "page": (kind: "slice", value: "1 4 1"),
    },
    submit_with: Id("go"),
    output_table: (select: "by position", which: 1, table_name: "odds"),
    table_wait: (by: Class, value: "results", delay: 2.5, throttle: 0.5, absent_str: "No results"),
    output_db: "scrape.db",
)"#;

fn parse(text: &str) -> ScrapeConfig {
    let options =
        ron::Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME);
    options.from_str(text).expect("config parses")
}

#[test]
fn document_parses_and_validates() {
    let config = parse(DOCUMENT);
    config.validate().unwrap();

    assert_eq!(config.range_specs().unwrap().len(), 3);
    assert_eq!(
        config.table_selection().unwrap(),
        TableSelection::ByPosition {
            which: 1,
            name: "odds".into()
        }
    );

    let table_wait = config.table_wait().unwrap();
    assert_eq!(table_wait.locator.kind, LocatorKind::Class);
    assert_eq!(table_wait.timeout, Duration::from_millis(2500));
    assert_eq!(table_wait.throttle, Duration::from_millis(500));
    assert_eq!(table_wait.absent_str.as_deref(), Some("No results"));

    // Unset waits fall back to waiting for <body>.
    assert_eq!(config.form_wait().unwrap(), Wait::default());
    assert!(!config.form_on_table_page);
    assert_eq!(config.form_tag, "form");
}

#[test]
fn validation_reports_bad_keys() {
    let mut config = parse(DOCUMENT);
    config.url = "not a url".into();
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::InvalidValue { .. }
    ));

    let mut config = parse(DOCUMENT);
    config.output_table.select = "sideways".into();
    assert_eq!(
        config.validate().unwrap_err(),
        ConfigError::UnknownSelectionMode("sideways".into())
    );

    let mut config = parse(DOCUMENT);
    if let Some(wait) = config.table_wait.as_mut() {
        wait.delay = -1.0;
    }
    assert!(config.validate().is_err());
}

#[test]
fn locators_compare_by_kind_and_value() {
    let config = parse(DOCUMENT);
    let table = config.table_wait().unwrap().locator;
    let form = config.form_wait().unwrap().locator;
    let same_value_other_kind = Locator {
        kind: LocatorKind::Id,
        value: table.value.clone(),
    };

    let seen: HashSet<Locator> = [table.clone(), form, same_value_other_kind, table].into();
    assert_eq!(seen.len(), 3);
}
