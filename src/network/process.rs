//! Process terms: a procedure table plus the current behaviour

use super::behaviour::{Behaviour, Renaming};
use crate::error::NetworkError;
use std::collections::{BTreeMap, BTreeSet};
use std::collections::hash_map::DefaultHasher;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A procedure local to one process
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Procedure {
    /// Process-name parameters, substituted by the call arguments on unfolding
    pub parameters: Vec<String>,
    /// Procedure body
    pub body: Arc<Behaviour>,
}

/// One process of a network
///
/// The procedure table is shared between copies of a term; only `main`
/// changes as the process advances.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessTerm {
    pub(crate) procedures: Arc<BTreeMap<String, Procedure>>,
    pub(crate) main: Arc<Behaviour>,
}

enum UnfoldFailure {
    Undefined(String),
    Arity {
        procedure: String,
        expected: usize,
        found: usize,
    },
    Unguarded(String),
}

impl UnfoldFailure {
    fn into_error(self, process: &str) -> NetworkError {
        let process = process.to_string();
        match self {
            UnfoldFailure::Undefined(procedure) => NetworkError::UndefinedProcedure { process, procedure },
            UnfoldFailure::Arity {
                procedure,
                expected,
                found,
            } => NetworkError::ArityMismatch {
                process,
                procedure,
                expected,
                found,
            },
            UnfoldFailure::Unguarded(procedure) => NetworkError::UnguardedRecursion { process, procedure },
        }
    }
}

impl ProcessTerm {
    /// Creates a process term without procedures.
    pub fn new(main: Behaviour) -> Self {
        ProcessTerm {
            procedures: Arc::new(BTreeMap::new()),
            main: Arc::new(main),
        }
    }

    /// Adds a procedure definition, replacing any previous one of that name.
    pub fn with_procedure<P: Into<String>>(
        mut self,
        name: impl Into<String>,
        parameters: impl IntoIterator<Item = P>,
        body: Behaviour,
    ) -> Self {
        let procedure = Procedure {
            parameters: parameters.into_iter().map(Into::into).collect(),
            body: Arc::new(body),
        };
        Arc::make_mut(&mut self.procedures).insert(name.into(), procedure);
        self
    }

    /// The behaviour the process is about to perform.
    pub fn main(&self) -> &Behaviour {
        &self.main
    }

    /// Procedures available to this process, by name.
    pub fn procedures(&self) -> &BTreeMap<String, Procedure> {
        &self.procedures
    }

    /// This term with the process references of `main` renamed.
    pub(crate) fn renamed(&self, renaming: &Renaming) -> Self {
        self.with_main(Behaviour::renamed(&self.main, renaming))
    }

    /// Fingerprint of the term's structure with every process name left out.
    ///
    /// Terms that differ only by a renaming of processes share a shape.
    pub(crate) fn shape(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.main.hash_shape(&mut hasher);
        for (name, procedure) in self.procedures.iter() {
            name.hash(&mut hasher);
            procedure.parameters.len().hash(&mut hasher);
            procedure.body.hash_shape(&mut hasher);
        }
        hasher.finish()
    }

    pub(crate) fn with_main(&self, main: Arc<Behaviour>) -> Self {
        ProcessTerm {
            procedures: Arc::clone(&self.procedures),
            main,
        }
    }

    /// Replace a main that is a procedure call by the procedure's body,
    /// repeatedly, until the main is some other behaviour.
    ///
    /// `process` names this term in errors.
    pub fn unfold(&self, process: &str) -> Result<ProcessTerm, NetworkError> {
        match &*self.main {
            Behaviour::Call { .. } => {}
            _ => return Ok(self.clone()),
        }
        let main = self.expand_main().map_err(|failure| failure.into_error(process))?;
        Ok(self.with_main(main))
    }

    fn expand_main(&self) -> Result<Arc<Behaviour>, UnfoldFailure> {
        let mut main = Arc::clone(&self.main);
        let mut visited = BTreeSet::new();
        while let Behaviour::Call {
            procedure,
            arguments,
        } = &*main
        {
            if !visited.insert(procedure.clone()) {
                return Err(UnfoldFailure::Unguarded(procedure.clone()));
            }
            let definition = self
                .procedures
                .get(procedure)
                .ok_or_else(|| UnfoldFailure::Undefined(procedure.clone()))?;
            if arguments.len() != definition.parameters.len() {
                return Err(UnfoldFailure::Arity {
                    procedure: procedure.clone(),
                    expected: definition.parameters.len(),
                    found: arguments.len(),
                });
            }

            let substitution: Renaming = definition
                .parameters
                .iter()
                .cloned()
                .zip(arguments.iter().cloned())
                .collect();
            let next = Behaviour::renamed(&definition.body, &substitution);
            main = next;
        }
        Ok(main)
    }

    /// Check whether this process has no actions left, looking through calls.
    ///
    /// A call that cannot be unfolded does not count as terminated.
    pub fn is_terminated(&self) -> bool {
        match self.expand_main() {
            Ok(main) => matches!(*main, Behaviour::Terminate),
            Err(_) => false,
        }
    }

    /// Every name referred to by `main` or by any procedure body.
    pub fn mentioned_processes(&self) -> BTreeSet<String> {
        let mut mentioned = BTreeSet::new();
        self.main.mentioned_processes(&mut mentioned);
        for procedure in self.procedures.values() {
            procedure.body.mentioned_processes(&mut mentioned);
        }
        mentioned
    }
}

impl Display for ProcessTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (name, procedure) in self.procedures.iter() {
            write!(f, "def {}", name)?;
            if !procedure.parameters.is_empty() {
                write!(f, "({})", procedure.parameters.join(", "))?;
            }
            write!(f, " {{{}}} ", procedure.body)?;
        }
        write!(f, "main {{{}}}}}", self.main)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looping() -> ProcessTerm {
        ProcessTerm::new(Behaviour::call("X", ["q"])).with_procedure(
            "X",
            ["r"],
            Behaviour::send("r", "e", Behaviour::call("X", ["r"])),
        )
    }

    #[test]
    fn test_unfold_substitutes_parameters() {
        let unfolded = looping().unfold("p").unwrap();
        assert_eq!(
            *unfolded.main(),
            Behaviour::send("q", "e", Behaviour::call("X", ["q"]))
        );
        assert_eq!(unfolded.procedures(), looping().procedures());
    }

    #[test]
    fn test_unfold_non_call_is_identity() {
        let term = ProcessTerm::new(Behaviour::receive("q", Behaviour::Terminate));
        assert_eq!(term.unfold("p").unwrap(), term);
    }

    #[test]
    fn test_unfold_errors() {
        let undefined = ProcessTerm::new(Behaviour::call("Y", Vec::<String>::new()));
        assert_eq!(
            undefined.unfold("p"),
            Err(NetworkError::UndefinedProcedure {
                process: "p".into(),
                procedure: "Y".into()
            })
        );

        let unguarded = ProcessTerm::new(Behaviour::call("X", Vec::<String>::new())).with_procedure(
            "X",
            Vec::<String>::new(),
            Behaviour::call("X", Vec::<String>::new()),
        );
        assert!(matches!(
            unguarded.unfold("p"),
            Err(NetworkError::UnguardedRecursion { .. })
        ));

        let arity = ProcessTerm::new(Behaviour::call("X", ["a", "b"]))
            .with_procedure("X", ["a"], Behaviour::Terminate);
        assert!(matches!(
            arity.unfold("p"),
            Err(NetworkError::ArityMismatch {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_is_terminated_through_calls() {
        let term = ProcessTerm::new(Behaviour::call("Done", Vec::<String>::new())).with_procedure(
            "Done",
            Vec::<String>::new(),
            Behaviour::Terminate,
        );
        assert!(term.is_terminated());
        assert!(!looping().is_terminated());
        assert!(ProcessTerm::new(Behaviour::Terminate).is_terminated());
    }

    #[test]
    fn test_shape_ignores_process_names() {
        let term = |peer: &str| {
            ProcessTerm::new(Behaviour::send(peer, "e", Behaviour::receive(peer, Behaviour::Terminate)))
        };
        assert_eq!(term("q").shape(), term("r").shape());
        assert_ne!(term("q").shape(), ProcessTerm::new(Behaviour::send("q", "e", Behaviour::Terminate)).shape());

        let renaming: Renaming = [("q".to_string(), "r".to_string())].into_iter().collect();
        assert_eq!(term("q").renamed(&renaming), term("r"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            looping().to_string(),
            "{def X(r) {r!<e>; X(r)} main {X(q)}}"
        );
    }
}
