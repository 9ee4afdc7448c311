use once_cell::sync::Lazy;
use regex::Regex;

/// Numeric plant code, a pipe, then a non-empty generator with no further pipe.
static STRICT_COMPOSITE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\|[^|]+$").expect("static regex"));

/// A parsed `"<plant_code>|<generator_id>"` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeId {
    pub plant_code: String,
    pub generator_id: String,
}

/// Split a composite id on its pipe.
///
/// Anything that does not split into exactly two parts is unparseable and
/// yields `None`. Both parts are trimmed.
pub fn split_composite_id(id: &str) -> Option<CompositeId> {
    if id.trim().is_empty() {
        return None;
    }
    let mut parts = id.split('|');
    let (code, generator) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    Some(CompositeId {
        plant_code: code.trim().to_string(),
        generator_id: generator.trim().to_string(),
    })
}

/// Whether `id` is publishable as a primary key.
///
/// Rejects spreadsheet error strings (`#VALUE!`) and free-text entries such as
/// `"52071, EIA: 6648|GEN1"`.
pub fn is_strict_composite_id(id: &str) -> bool {
    STRICT_COMPOSITE_ID.is_match(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn splits_plant_and_generator() {
        let id = split_composite_id("6076|1").unwrap();
        assert_eq!(id.plant_code, "6076");
        assert_eq!(id.generator_id, "1");
    }

    #[test]
    fn trims_parts() {
        let id = split_composite_id(" 6076 | ST1 ").unwrap();
        assert_eq!(id.plant_code, "6076");
        assert_eq!(id.generator_id, "ST1");
    }

    #[test]
    fn rejects_wrong_part_count() {
        assert_eq!(split_composite_id("6076"), None);
        assert_eq!(split_composite_id("6076|1|2"), None);
        assert_eq!(split_composite_id(""), None);
    }

    #[test]
    fn strict_pattern() {
        assert!(is_strict_composite_id("6076|1"));
        assert!(is_strict_composite_id("55|GEN 2"));
        assert!(!is_strict_composite_id("6076|"));
        assert!(!is_strict_composite_id("#VALUE!"));
        assert!(!is_strict_composite_id("52071, EIA: 6648|GEN1"));
        assert!(!is_strict_composite_id("ABC|1"));
        assert!(!is_strict_composite_id("6076|1|2"));
        assert!(!is_strict_composite_id("6076||"));
    }

    proptest! {
        #[test]
        fn split_recovers_components(code in "[0-9]{1,6}", generator in "[A-Za-z0-9]{1,5}") {
            let id = split_composite_id(&format!("{code}|{generator}")).unwrap();
            prop_assert_eq!(id.plant_code, code);
            prop_assert_eq!(id.generator_id, generator);
        }

        #[test]
        fn strict_ids_always_split(code in "[0-9]{1,6}", generator in "[A-Za-z0-9 |]{1,6}") {
            let id = format!("{code}|{generator}");
            if is_strict_composite_id(&id) {
                prop_assert!(split_composite_id(&id).is_some());
            }
        }

        #[test]
        fn split_rejects_ids_without_exactly_one_pipe(s in "[^|]{0,12}(\\|[^|]{0,4}){2,3}|[^|]{0,12}") {
            prop_assert!(split_composite_id(&s).is_none());
        }
    }
}
