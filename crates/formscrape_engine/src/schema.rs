use std::collections::BTreeMap;

use engine_logging::engine_warn;
use formscrape_core::{FieldDescriptor, FormDescriptor, FormSet};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

pub const DEFAULT_FORM_TAG: &str = "form";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("broken radio button {radio_id:?}: expected exactly one label for it, found {labels}")]
    BrokenRadioButton { radio_id: String, labels: usize },
    #[error("radio button in group {group:?} has no id to tie a label to")]
    RadioWithoutId { group: String },
    #[error("invalid form tag {0:?}")]
    InvalidTag(String),
}

/// Forms found on a page, plus how many element ids had to be made up per
/// form. A high count means the page gives its controls no stable ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanReport {
    pub forms: FormSet,
    pub synthesized_ids: BTreeMap<String, usize>,
}

/// Hands out ids for elements that lack one. One counter lives for exactly one
/// `extract_forms` call.
#[derive(Debug)]
struct IdCounter {
    last: u64,
}

impl IdCounter {
    fn new() -> Self {
        Self { last: 0 }
    }

    fn issue(&mut self) -> String {
        self.last += 1;
        self.last.to_string()
    }

    fn id_or_issue(&mut self, id: Option<&str>) -> String {
        match id {
            Some(id) => id.to_string(),
            None => self.issue(),
        }
    }
}

struct Selectors {
    text_inputs: Selector,
    radios: Selector,
    labels: Selector,
    selects: Selector,
    options: Selector,
    // Matches elements whose tag is literally `hidden`, not `<input type="hidden">`.
    hidden: Selector,
    buttons: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            text_inputs: parse_static(r#"input[type="text"]"#),
            radios: parse_static(r#"input[type="radio"]"#),
            labels: parse_static("label[for]"),
            selects: parse_static("select"),
            options: parse_static("option"),
            hidden: parse_static("hidden"),
            buttons: parse_static("button"),
        }
    }
}

fn parse_static(selector: &'static str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|_| unreachable!("static selector {selector}"))
}

/// Reads every `form_tag` element of a page into a [`FormDescriptor`].
pub fn extract_forms(html: &str, form_tag: &str) -> Result<ScanReport, SchemaError> {
    let document = Html::parse_document(html);
    let form_selector =
        Selector::parse(form_tag).map_err(|_| SchemaError::InvalidTag(form_tag.to_string()))?;
    let selectors = Selectors::new();
    // Labels are matched across the whole page, not just inside the form.
    let labels: Vec<ElementRef<'_>> = document.select(&selectors.labels).collect();

    let mut counter = IdCounter::new();
    let mut report = ScanReport::default();
    for form in document.select(&form_selector) {
        let issued_before = counter.last;
        let descriptor = read_form(form, &labels, &selectors, &mut counter)?;
        let synthesized = (counter.last - issued_before) as usize;
        if synthesized > 0 {
            engine_warn!(
                "Form {} had {} id-less element(s); synthesized ids are not stable across page versions",
                descriptor.id,
                synthesized
            );
        }
        report.synthesized_ids.insert(descriptor.id.clone(), synthesized);
        report.forms.insert(descriptor.id.clone(), descriptor);
    }
    Ok(report)
}

fn read_form(
    form: ElementRef<'_>,
    labels: &[ElementRef<'_>],
    selectors: &Selectors,
    counter: &mut IdCounter,
) -> Result<FormDescriptor, SchemaError> {
    let id = counter.id_or_issue(form.value().id());
    let mut inputs = BTreeMap::new();

    for input in form.select(&selectors.text_inputs) {
        inputs.insert(
            counter.id_or_issue(input.value().id()),
            FieldDescriptor::Text {
                name: attr(input, "name"),
            },
        );
    }

    for radio in form.select(&selectors.radios) {
        let group = counter.id_or_issue(radio.value().attr("name"));
        let radio_id = radio
            .value()
            .id()
            .ok_or_else(|| SchemaError::RadioWithoutId {
                group: group.clone(),
            })?
            .to_string();
        let matches: Vec<&ElementRef<'_>> = labels
            .iter()
            .filter(|label| label.value().attr("for") == Some(radio_id.as_str()))
            .collect();
        let label = match matches.as_slice() {
            [label] => **label,
            other => {
                return Err(SchemaError::BrokenRadioButton {
                    radio_id,
                    labels: other.len(),
                })
            }
        };

        let entry = inputs.entry(group).or_insert_with(|| FieldDescriptor::Radio {
            name: attr(radio, "name"),
            radio_ids: Vec::new(),
            label_ids: Vec::new(),
            label_texts: Vec::new(),
        });
        if !matches!(entry, FieldDescriptor::Radio { .. }) {
            *entry = FieldDescriptor::Radio {
                name: attr(radio, "name"),
                radio_ids: Vec::new(),
                label_ids: Vec::new(),
                label_texts: Vec::new(),
            };
        }
        if let FieldDescriptor::Radio {
            radio_ids,
            label_ids,
            label_texts,
            ..
        } = entry
        {
            radio_ids.push(radio_id);
            label_ids.push(attr(label, "id"));
            label_texts.push(text_of(label));
        }
    }

    for select in form.select(&selectors.selects) {
        let options: Vec<ElementRef<'_>> = select.select(&selectors.options).collect();
        inputs.insert(
            counter.id_or_issue(select.value().id()),
            FieldDescriptor::Select {
                name: attr(select, "name"),
                values: options.iter().map(|option| attr(*option, "value")).collect(),
                texts: options.iter().map(|option| text_of(*option)).collect(),
            },
        );
    }

    for hidden in form.select(&selectors.hidden) {
        inputs.insert(
            counter.id_or_issue(hidden.value().id()),
            FieldDescriptor::Hidden {
                name: attr(hidden, "name"),
            },
        );
    }

    let buttons = form
        .select(&selectors.buttons)
        .map(|button| (counter.id_or_issue(button.value().id()), text_of(button)))
        .collect();

    Ok(FormDescriptor {
        id,
        inputs,
        buttons,
    })
}

fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(str::to_string)
}

/// Visible text with runs of whitespace collapsed.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
