//! Choreographies and procedure definitions

use super::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display, Formatter};

/// A named, possibly parameterised procedure of a choreography
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcedureDefinition {
    /// Procedure name, e.g. `X1`
    pub name: String,
    /// Process parameters
    pub parameters: Vec<String>,
    /// Procedure body
    pub body: ChoreographyBody,
}

impl ProcedureDefinition {
    /// Creates a procedure without parameters.
    pub fn new(name: impl Into<String>, body: ChoreographyBody) -> Self {
        ProcedureDefinition {
            name: name.into(),
            parameters: Vec::new(),
            body,
        }
    }

    /// Creates a procedure taking the given process parameters.
    pub fn with_parameters<P: Into<String>>(
        name: impl Into<String>,
        parameters: impl IntoIterator<Item = P>,
        body: ChoreographyBody,
    ) -> Self {
        ProcedureDefinition {
            name: name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
            body,
        }
    }
}

/// Sort key for procedure names: `X2` comes before `X10`.
fn procedure_order(name: &str) -> (&str, Option<u64>, &str) {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    (stem, name[stem.len()..].parse().ok(), name)
}

/// A complete extracted choreography: one main body and its procedures
///
/// Procedures are kept sorted by name, numeric suffixes compared as numbers,
/// so that the printed form of a choreography does not depend on the order
/// they were produced in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choreography {
    /// Named procedures
    pub procedures: Vec<ProcedureDefinition>,
    /// Entry point
    pub main: ChoreographyBody,
}

impl Choreography {
    /// Creates a choreography, sorting its procedures.
    pub fn new(main: ChoreographyBody, mut procedures: Vec<ProcedureDefinition>) -> Self {
        procedures.sort_by(|a, b| procedure_order(&a.name).cmp(&procedure_order(&b.name)));
        Choreography { procedures, main }
    }

    /// Look up a procedure by name.
    pub fn procedure(&self, name: &str) -> Option<&ProcedureDefinition> {
        self.procedures.iter().find(|p| p.name == name)
    }

    /// All processes mentioned in main or in any procedure body.
    pub fn processes(&self) -> BTreeSet<String> {
        let mut processes = self.main.processes();
        for procedure in &self.procedures {
            processes.extend(procedure.body.processes());
            processes.extend(procedure.parameters.iter().cloned());
        }
        processes
    }

    /// Check that procedure names are unique and that every call names a
    /// defined procedure with the right number of arguments.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut arities = HashMap::new();
        for procedure in &self.procedures {
            if arities
                .insert(procedure.name.as_str(), procedure.parameters.len())
                .is_some()
            {
                return Err(ValidationError::DuplicateProcedure(procedure.name.clone()));
            }
        }

        let bodies = std::iter::once(&self.main).chain(self.procedures.iter().map(|p| &p.body));
        for body in bodies {
            for (procedure, found) in body.calls() {
                match arities.get(procedure) {
                    None => return Err(ValidationError::UndefinedProcedure(procedure.to_string())),
                    Some(&expected) if expected != found => {
                        return Err(ValidationError::ArityMismatch {
                            procedure: procedure.to_string(),
                            expected,
                            found,
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

impl Display for Choreography {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for procedure in &self.procedures {
            write!(f, "def {}", procedure.name)?;
            if !procedure.parameters.is_empty() {
                write!(f, "({})", procedure.parameters.join(", "))?;
            }
            write!(f, " {{ {} }} ", procedure.body)?;
        }
        write!(f, "main {{{}}}", self.main)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looping() -> Choreography {
        let body = ChoreographyBody::prefixed(
            Interaction::communication("a", "b", "e"),
            ChoreographyBody::call("X1"),
        );
        Choreography::new(
            ChoreographyBody::call("X1"),
            vec![ProcedureDefinition::new("X1", body)],
        )
    }

    #[test]
    fn test_choreography_display() {
        assert_eq!(looping().to_string(), "def X1 { a.e->b; X1 } main {X1}");
    }

    #[test]
    fn test_procedures_sorted_by_name() {
        let chor = Choreography::new(
            ChoreographyBody::call("X2"),
            vec![
                ProcedureDefinition::new("X2", ChoreographyBody::call("X1")),
                ProcedureDefinition::new("X1", ChoreographyBody::Termination),
            ],
        );
        assert_eq!(chor.to_string(), "def X1 { stop } def X2 { X1 } main {X2}");
        assert!(chor.procedure("X1").is_some());
        assert!(chor.procedure("X3").is_none());
    }

    #[test]
    fn test_numeric_suffixes_sort_as_numbers() {
        let procedures = ["X10", "X2", "X1", "Y"]
            .into_iter()
            .map(|name| ProcedureDefinition::new(name, ChoreographyBody::Termination))
            .collect();
        let chor = Choreography::new(ChoreographyBody::call("X1"), procedures);
        let names: Vec<&str> = chor.procedures.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["X1", "X2", "X10", "Y"]);
    }

    #[test]
    fn test_parameterised_display() {
        let body = ChoreographyBody::prefixed(
            Interaction::communication("p", "q", "e"),
            ChoreographyBody::Call {
                procedure: "X1".into(),
                arguments: vec!["q".into()],
            },
        );
        let chor = Choreography::new(
            ChoreographyBody::Call {
                procedure: "X1".into(),
                arguments: vec!["p".into()],
            },
            vec![ProcedureDefinition::with_parameters("X1", ["p"], body)],
        );
        assert_eq!(chor.to_string(), "def X1(p) { p.e->q; X1(q) } main {X1(p)}");
        assert_eq!(chor.validate(), Ok(()));
    }

    #[test]
    fn test_validate() {
        assert_eq!(looping().validate(), Ok(()));

        let undefined = Choreography::new(ChoreographyBody::call("Y"), vec![]);
        assert_eq!(
            undefined.validate(),
            Err(ValidationError::UndefinedProcedure("Y".into()))
        );

        let arity = Choreography::new(
            ChoreographyBody::Call {
                procedure: "X1".into(),
                arguments: vec!["a".into()],
            },
            vec![ProcedureDefinition::new("X1", ChoreographyBody::Termination)],
        );
        assert!(matches!(
            arity.validate(),
            Err(ValidationError::ArityMismatch { expected: 0, found: 1, .. })
        ));

        let duplicate = Choreography::new(
            ChoreographyBody::Termination,
            vec![
                ProcedureDefinition::new("X1", ChoreographyBody::Termination),
                ProcedureDefinition::new("X1", ChoreographyBody::Termination),
            ],
        );
        assert_eq!(
            duplicate.validate(),
            Err(ValidationError::DuplicateProcedure("X1".into()))
        );
    }
}
