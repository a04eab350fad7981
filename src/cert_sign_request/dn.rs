use rcgen::{DistinguishedName, DnType, DnValue};

use crate::{config::Config, utils::Prompt};

/// Subject attributes the tool asks for, in the order they're encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    Country,
    State,
    City,
    Organization,
    CommonName,
}

impl SubjectKind {
    pub const ALL: [SubjectKind; 5] = [
        SubjectKind::Country,
        SubjectKind::State,
        SubjectKind::City,
        SubjectKind::Organization,
        SubjectKind::CommonName,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SubjectKind::Country => "Country",
            SubjectKind::State => "State",
            SubjectKind::City => "City",
            SubjectKind::Organization => "Organization",
            SubjectKind::CommonName => "Common Name",
        }
    }

    pub fn dn_type(self) -> DnType {
        match self {
            SubjectKind::Country => DnType::CountryName,
            SubjectKind::State => DnType::StateOrProvinceName,
            SubjectKind::City => DnType::LocalityName,
            SubjectKind::Organization => DnType::OrganizationName,
            SubjectKind::CommonName => DnType::CommonName,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectField {
    pub kind: SubjectKind,
    pub value: String,
}

/// Applies the prompt rule to one answer: empty takes the default, a lone
/// `.` drops the field, anything else overrides it.
pub fn resolve_field(input: &str, default: &str) -> Option<String> {
    match input.trim() {
        "" => Some(default.to_owned()),
        "." => None,
        value => Some(value.to_owned()),
    }
}

/// Ordered subject fields. Each `with_field` call hands back the grown
/// subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    fields: Vec<SubjectField>,
}

impl Subject {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, kind: SubjectKind, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.fields.push(SubjectField { kind, value });
        }
        self
    }

    pub fn fields(&self) -> &[SubjectField] {
        &self.fields
    }

    pub fn get(&self, kind: SubjectKind) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.kind == kind)
            .map(|field| field.value.as_str())
    }

    pub fn common_name(&self) -> Option<&str> {
        self.get(SubjectKind::CommonName)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<&Subject> for DistinguishedName {
    fn from(value: &Subject) -> Self {
        let mut dn = Self::new();

        for field in value.fields() {
            let dn_value = match field.kind {
                // country codes are PrintableString whenever the text allows it
                SubjectKind::Country => field
                    .value
                    .clone()
                    .try_into()
                    .map(DnValue::PrintableString)
                    .unwrap_or_else(|_| DnValue::Utf8String(field.value.clone())),
                _ => DnValue::Utf8String(field.value.clone()),
            };
            dn.push(field.kind.dn_type(), dn_value);
        }

        dn
    }
}

pub fn get_subject_interactive(
    rl: &mut impl Prompt,
    config: &Config,
) -> anyhow::Result<Subject> {
    let mut subject = Subject::new();
    for kind in SubjectKind::ALL {
        let default = config.default_for(kind);
        let input = rl.read_line(&format!("{} [{default}]: ", kind.label()))?;
        subject = subject.with_field(kind, resolve_field(&input, default));
    }
    Ok(subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{key::DEFAULT_KEY_BITS, utils::testing::Scripted};

    fn config() -> Config {
        Config {
            country: "US".into(),
            state: "Oregon".into(),
            city: "Portland".into(),
            organization: "Example Corp".into(),
            common_name: "www.example.com".into(),
            key_bits: DEFAULT_KEY_BITS,
            alt_names: Vec::new(),
        }
    }

    #[test]
    fn empty_input_takes_default() {
        assert_eq!(resolve_field("", "US").as_deref(), Some("US"));
    }

    #[test]
    fn dot_clears_field() {
        assert_eq!(resolve_field(".", "US"), None);
    }

    #[test]
    fn other_input_overrides() {
        assert_eq!(resolve_field("CA", "US").as_deref(), Some("CA"));
    }

    #[test]
    fn input_is_trimmed_first() {
        assert_eq!(resolve_field("   ", "US").as_deref(), Some("US"));
        assert_eq!(resolve_field(" . ", "US"), None);
        assert_eq!(resolve_field(" CA\t", "US").as_deref(), Some("CA"));
        assert_eq!(resolve_field("..", "US").as_deref(), Some(".."));
    }

    #[test]
    fn prompts_show_defaults_in_order() {
        let mut rl = Scripted::new(["", "", "", "", ""]);

        get_subject_interactive(&mut rl, &config()).unwrap();

        assert_eq!(
            rl.prompts,
            vec![
                "Country [US]: ",
                "State [Oregon]: ",
                "City [Portland]: ",
                "Organization [Example Corp]: ",
                "Common Name [www.example.com]: ",
            ]
        );
    }

    #[test]
    fn collected_subject_keeps_order_and_skips_cleared() {
        let mut rl = Scripted::new(["CA", ".", "", "Acme", "api.acme.test"]);

        let subject = get_subject_interactive(&mut rl, &config()).unwrap();

        let kinds = subject
            .fields()
            .iter()
            .map(|field| field.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                SubjectKind::Country,
                SubjectKind::City,
                SubjectKind::Organization,
                SubjectKind::CommonName,
            ]
        );
        assert_eq!(subject.get(SubjectKind::Country), Some("CA"));
        assert_eq!(subject.get(SubjectKind::State), None);
        assert_eq!(subject.get(SubjectKind::City), Some("Portland"));
        assert_eq!(subject.common_name(), Some("api.acme.test"));
    }

    #[test]
    fn clearing_everything_leaves_empty_subject() {
        let mut rl = Scripted::new([".", ".", ".", ".", "."]);

        let subject = get_subject_interactive(&mut rl, &config()).unwrap();

        assert!(subject.is_empty());
        assert_eq!(subject.common_name(), None);
    }

    #[test]
    fn distinguished_name_follows_field_order() {
        let subject = Subject::new()
            .with_field(SubjectKind::Country, Some("US".into()))
            .with_field(SubjectKind::State, None)
            .with_field(SubjectKind::CommonName, Some("example.com".into()));

        let dn = DistinguishedName::from(&subject);
        let types = dn.iter().map(|(ty, _)| ty.clone()).collect::<Vec<_>>();

        assert_eq!(types, vec![DnType::CountryName, DnType::CommonName]);
    }
}
