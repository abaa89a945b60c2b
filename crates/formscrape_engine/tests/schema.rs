use formscrape_core::FieldDescriptor;
use formscrape_engine::{extract_forms, SchemaError};
use pretty_assertions::assert_eq;

const ODDS_PAGE: &str = r#"
<html><body>
  <form id="search">
    <input type="text" id="team" name="team">
    <input type="radio" id="home" name="venue"> <label for="home" id="l-home">Home</label>
    <input type="radio" id="away" name="venue"> <label for="away">  Away
      games </label>
    <select id="season" name="season">
      <option value="2023">2023/24</option>
      <option>All seasons</option>
    </select>
    <input type="hidden" id="csrf" name="csrf" value="x">
    <hidden id="legacy" name="legacy"></hidden>
    <button id="go">Search</button>
    <button>Reset</button>
  </form>
</body></html>
"#;

#[test]
fn extracts_every_field_kind() {
    let report = extract_forms(ODDS_PAGE, "form").unwrap();
    let form = &report.forms["search"];

    assert_eq!(form.id, "search");
    assert_eq!(
        form.inputs["team"],
        FieldDescriptor::Text {
            name: Some("team".into())
        }
    );
    assert_eq!(
        form.inputs["venue"],
        FieldDescriptor::Radio {
            name: Some("venue".into()),
            radio_ids: vec!["home".into(), "away".into()],
            label_ids: vec![Some("l-home".into()), None],
            label_texts: vec!["Home".into(), "Away games".into()],
        }
    );
    assert_eq!(
        form.inputs["season"],
        FieldDescriptor::Select {
            name: Some("season".into()),
            values: vec![Some("2023".into()), None],
            texts: vec!["2023/24".into(), "All seasons".into()],
        }
    );
    assert_eq!(form.buttons["go"], "Search");
}

#[test]
fn hidden_means_the_hidden_tag_not_hidden_inputs() {
    let report = extract_forms(ODDS_PAGE, "form").unwrap();
    let form = &report.forms["search"];

    assert_eq!(
        form.inputs["legacy"],
        FieldDescriptor::Hidden {
            name: Some("legacy".into())
        }
    );
    assert!(!form.inputs.contains_key("csrf"));
}

#[test]
fn id_less_elements_get_ids_counted_per_call() {
    let first = extract_forms(ODDS_PAGE, "form").unwrap();
    let second = extract_forms(ODDS_PAGE, "form").unwrap();

    // The reset button is the only id-less element; numbering restarts per call.
    assert_eq!(first.forms["search"].buttons["1"], "Reset");
    assert_eq!(first, second);
    assert_eq!(first.synthesized_ids["search"], 1);
}

#[test]
fn radio_labels_are_found_outside_the_form() {
    let page = r#"
        <label for="r1">One</label>
        <form id="f"><input type="radio" id="r1" name="pick"></form>
    "#;
    let report = extract_forms(page, "form").unwrap();
    assert_eq!(report.forms["f"].inputs["pick"].options(), ["r1"]);
}

#[test]
fn radio_without_exactly_one_label_is_broken() {
    let unlabeled = r#"<form id="f"><input type="radio" id="r1" name="pick"></form>"#;
    assert_eq!(
        extract_forms(unlabeled, "form").unwrap_err(),
        SchemaError::BrokenRadioButton {
            radio_id: "r1".into(),
            labels: 0
        }
    );

    let doubly_labeled = r#"
        <form id="f">
          <input type="radio" id="r1" name="pick">
          <label for="r1">One</label><label for="r1">Uno</label>
        </form>
    "#;
    assert_eq!(
        extract_forms(doubly_labeled, "form").unwrap_err(),
        SchemaError::BrokenRadioButton {
            radio_id: "r1".into(),
            labels: 2
        }
    );
}

#[test]
fn custom_form_tag_selects_other_containers() {
    let page = r#"<div class="fake-form" id="wrapper"><input type="text" id="q"></div>"#;
    let report = extract_forms(page, "div").unwrap();
    assert!(report.forms["wrapper"].inputs.contains_key("q"));
    assert!(extract_forms(page, "form").unwrap().forms.is_empty());
}

#[test]
fn unparsable_form_tag_is_an_error() {
    assert_eq!(
        extract_forms("<form></form>", "[[").unwrap_err(),
        SchemaError::InvalidTag("[[".into())
    );
}
