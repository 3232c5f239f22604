use apollo_parser::cst;
use indexmap::IndexMap;

use crate::graphql::Location;
use crate::spec::location_of;
use crate::spec::parse_selection_set;
use crate::spec::Selection;
use crate::spec::SpecError;

/// The named fragments of a document, in document order.
///
/// A name defined twice keeps its first definition; the later ones are listed in `duplicates`.
#[derive(Debug, Default)]
pub(crate) struct Fragments {
    map: IndexMap<String, Fragment>,
    duplicates: Vec<(String, Location)>,
}

impl Fragments {
    pub(crate) fn from_cst(document: &cst::Document, source: &str) -> Result<Self, SpecError> {
        let definitions = document
            .definitions()
            .filter_map(|definition| match definition {
                // Spec: https://spec.graphql.org/draft/#FragmentDefinition
                cst::Definition::FragmentDefinition(fragment_definition) => {
                    Some(fragment_definition)
                }
                _ => None,
            })
            .map(|fragment_definition| {
                let name = fragment_definition
                    .fragment_name()
                    .and_then(|fragment_name| fragment_name.name())
                    .map(|name| name.text().to_string())
                    .ok_or_else(|| SpecError::ParsingError {
                        message: "fragment definitions require a name".to_string(),
                        location: Some(location_of(&fragment_definition, source)),
                    })?;

                let type_condition = fragment_definition
                    .type_condition()
                    .and_then(|type_condition| type_condition.named_type())
                    .and_then(|named_type| named_type.name())
                    .map(|name| name.text().to_string())
                    .ok_or_else(|| SpecError::ParsingError {
                        message: format!("fragment '{name}' must specify the type it applies to"),
                        location: Some(location_of(&fragment_definition, source)),
                    })?;

                let selection_set =
                    parse_selection_set(fragment_definition.selection_set(), source)?;

                Ok((
                    name,
                    Fragment {
                        type_condition,
                        selection_set,
                        location: location_of(&fragment_definition, source),
                    },
                ))
            })
            .collect::<Result<Vec<_>, SpecError>>()?;

        let mut fragments = Fragments::default();
        for (name, fragment) in definitions {
            if fragments.map.contains_key(&name) {
                fragments.duplicates.push((name, fragment.location));
            } else {
                fragments.map.insert(name, fragment);
            }
        }
        Ok(fragments)
    }

    /// Fragment names defined more than once, with the location of each extra definition.
    pub(crate) fn duplicates(&self) -> &[(String, Location)] {
        &self.duplicates
    }

    pub(crate) fn get(&self, key: impl AsRef<str>) -> Option<&Fragment> {
        self.map.get(key.as_ref())
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fragment {
    pub(crate) type_condition: String,
    pub(crate) selection_set: Vec<Selection>,
    pub(crate) location: Location,
}
