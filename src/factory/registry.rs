//! Named-factory registry and callable resolution.
//!
//! Callables are registered under dotted paths, `pkg.sub.Member`: the last
//! segment is the member name and the prefix is the module path. A path
//! without a dot registers a bare identifier in the root module.
//!
//! Resolution precedence for one spec:
//! 1) no `module`: split the class/factory path on its last dot
//! 2) `module` set: look the class/factory name up in it verbatim
//! 3) `class` + `constructor`: use the class's alternate constructor
//! 4) `factory`: use the member directly

use crate::error::SpinError;
use crate::factory::instance::Constructor;
use crate::spec::{CallableRef, InstanceSpec};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// Root module holding bare identifiers.
const ROOT_MODULE: &str = "";

const PATH_RE: &str = r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$";

const IDENT_RE: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

#[derive(Clone)]
enum Member {
    Class(Class),
    Factory(Constructor),
}

#[derive(Clone)]
struct Class {
    new: Constructor,
    constructors: BTreeMap<String, Constructor>,
}

/// Callable picked for one spec, with the path it was found under.
#[derive(Clone)]
pub struct Resolved {
    pub path: String,
    pub constructor: Constructor,
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved").field("path", &self.path).finish()
    }
}

#[derive(Clone, Default)]
pub struct FactoryRegistry {
    modules: BTreeMap<String, BTreeMap<String, Member>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the stock factories (see `builtins`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::factory::builtins::install(&mut registry).expect("builtin paths are valid");
        registry
    }

    /// Register a class whose default constructor is `new`.
    pub fn register_class(&mut self, path: &str, new: Constructor) -> Result<(), SpinError> {
        self.insert(
            path,
            Member::Class(Class {
                new,
                constructors: BTreeMap::new(),
            }),
        )
    }

    /// Register an alternate constructor `name` on an already-registered class.
    pub fn register_constructor(
        &mut self,
        class_path: &str,
        name: &str,
        ctor: Constructor,
    ) -> Result<(), SpinError> {
        let re = Regex::new(IDENT_RE)?;
        if !re.is_match(name) {
            return Err(SpinError::Registration {
                path: format!("{}.{}", class_path, name),
                reason: "constructor name is not an identifier".to_string(),
            });
        }

        let (module, member) = split_path(class_path);
        let class = match self
            .modules
            .get_mut(module)
            .and_then(|members| members.get_mut(member))
        {
            Some(Member::Class(class)) => class,
            Some(Member::Factory(_)) => {
                return Err(SpinError::Registration {
                    path: class_path.to_string(),
                    reason: "is a factory, not a class".to_string(),
                });
            }
            None => {
                return Err(SpinError::Registration {
                    path: class_path.to_string(),
                    reason: "class is not registered".to_string(),
                });
            }
        };
        if class.constructors.contains_key(name) {
            return Err(SpinError::Registration {
                path: format!("{}.{}", class_path, name),
                reason: "constructor already registered".to_string(),
            });
        }
        class.constructors.insert(name.to_string(), ctor);
        Ok(())
    }

    pub fn register_factory(&mut self, path: &str, f: Constructor) -> Result<(), SpinError> {
        self.insert(path, Member::Factory(f))
    }

    pub fn contains(&self, path: &str) -> bool {
        let (module, member) = split_path(path);
        self.modules
            .get(module)
            .is_some_and(|members| members.contains_key(member))
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.modules
            .iter()
            .flat_map(|(module, members)| {
                members.keys().map(move |member| join_path(module, member))
            })
            .collect()
    }

    fn insert(&mut self, path: &str, member: Member) -> Result<(), SpinError> {
        let re = Regex::new(PATH_RE)?;
        if !re.is_match(path) {
            return Err(SpinError::Registration {
                path: path.to_string(),
                reason: "not a dotted identifier path".to_string(),
            });
        }

        let (module, name) = split_path(path);
        let members = self.modules.entry(module.to_string()).or_default();
        if members.contains_key(name) {
            return Err(SpinError::Registration {
                path: path.to_string(),
                reason: "already registered".to_string(),
            });
        }
        members.insert(name.to_string(), member);
        Ok(())
    }

    /// Pick the callable for the spec of instance `name`.
    ///
    /// Pure with respect to built instances: nothing is constructed here.
    pub fn resolve(&self, name: &str, spec: &InstanceSpec) -> Result<Resolved, SpinError> {
        match spec.callable_ref(name)? {
            CallableRef::Class {
                module,
                class,
                constructor,
            } => {
                let (path, member) = self.lookup(module, class)?;
                match (member, constructor) {
                    (Member::Class(c), None) => Ok(Resolved {
                        path,
                        constructor: c.new.clone(),
                    }),
                    (Member::Class(c), Some(ctor)) => match c.constructors.get(ctor) {
                        Some(f) => Ok(Resolved {
                            path: format!("{}.{}", path, ctor),
                            constructor: f.clone(),
                        }),
                        None => Err(SpinError::ConstructorNotFound {
                            path,
                            constructor: ctor.to_string(),
                        }),
                    },
                    // A plain callable named as a class still works without `constructor`.
                    (Member::Factory(f), None) => Ok(Resolved {
                        path,
                        constructor: f.clone(),
                    }),
                    (Member::Factory(_), Some(ctor)) => Err(SpinError::ConstructorNotFound {
                        path,
                        constructor: ctor.to_string(),
                    }),
                }
            }
            CallableRef::Factory { module, factory } => {
                let (path, member) = self.lookup(module, factory)?;
                let constructor = match member {
                    Member::Factory(f) => f.clone(),
                    Member::Class(c) => c.new.clone(),
                };
                Ok(Resolved { path, constructor })
            }
        }
    }

    fn lookup(&self, module: Option<&str>, target: &str) -> Result<(String, &Member), SpinError> {
        let (module, member) = match module {
            Some(module) => (module, target),
            None => split_path(target),
        };
        let path = join_path(module, member);

        let members = self
            .modules
            .get(module)
            .ok_or_else(|| SpinError::ModuleNotFound {
                path: path.clone(),
                module: module.to_string(),
            })?;
        let found = members
            .get(member)
            .ok_or_else(|| SpinError::MemberNotFound {
                path: path.clone(),
                module: module.to_string(),
                member: member.to_string(),
            })?;
        Ok((path, found))
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("paths", &self.paths())
            .finish()
    }
}

/// "pkg.sub.Name" => ("pkg.sub", "Name"); "Name" => ("", "Name").
fn split_path(path: &str) -> (&str, &str) {
    path.rsplit_once('.').unwrap_or((ROOT_MODULE, path))
}

fn join_path(module: &str, member: &str) -> String {
    if module.is_empty() {
        member.to_string()
    } else {
        format!("{}.{}", module, member)
    }
}
