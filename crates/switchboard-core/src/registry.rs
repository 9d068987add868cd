//! Method registry.
//!
//! A receiver declares its capability set by implementing [`Receiver`]. At
//! registration time every declared method is checked against the RPC method
//! shape and the survivors are stored as [`MethodDescriptor`]s keyed by their
//! qualified name (`Service.Method`). Dispatch is then a map lookup followed by
//! one decode/invoke/encode cycle.
//!
//! The RPC method shape is
//!
//! ```text
//! fn(&Receiver, Args, &mut Reply) -> Result<(), E>
//! ```
//!
//! Parameter count, the reply being passed by reference and the error-capable
//! return are enforced by the bounds on [`Methods::add`]. The name and
//! visibility rules are checked when the receiver is registered; see
//! [`Rejection`].
//!
//! # Thread Safety
//!
//! The name table sits behind a `RwLock` (dispatch is a read, registration a
//! rare write). Each descriptor owns its call counter behind its own `Mutex`,
//! so unrelated methods never contend.

use crate::codec;
use crate::error::{DispatchError, RegistryError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

type Handler<R> =
    Arc<dyn Fn(&R, &[u8], &Mutex<u64>) -> Result<Vec<u8>, DispatchError> + Send + Sync>;

type Invoker = Box<dyn Fn(&[u8], &Mutex<u64>) -> Result<Vec<u8>, DispatchError> + Send + Sync>;

/// Describes the type carried in an argument or reply position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    type_name: &'static str,
}

impl Shape {
    /// Shape of `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified Rust type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Anonymous types (closures, async blocks) have no name a remote peer
    /// could agree on.
    pub fn is_externally_visible(&self) -> bool {
        !self.type_name.contains("{{")
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Why a declared method was left out of the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Method names must start with an ASCII uppercase letter.
    NotExported,
    /// Method names may only contain ASCII letters, digits and `_`.
    InvalidName,
    /// The argument type has no stable external name.
    ArgumentNotVisible(Shape),
    /// The reply type has no stable external name.
    ReplyNotVisible(Shape),
    /// The same method name was declared twice on one receiver.
    DuplicateMethod,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotExported => write!(f, "method is not exported"),
            Rejection::InvalidName => write!(f, "method name is not a plain identifier"),
            Rejection::ArgumentNotVisible(shape) => {
                write!(f, "argument type {} is not externally visible", shape)
            }
            Rejection::ReplyNotVisible(shape) => {
                write!(f, "reply type {} is not externally visible", shape)
            }
            Rejection::DuplicateMethod => write!(f, "method is declared more than once"),
        }
    }
}

/// A type whose methods can be exposed over RPC.
///
/// Implementations list their remotely callable methods; anything not listed
/// is never reachable.
pub trait Receiver: Send + Sync + Sized + 'static {
    /// Declare the candidate methods of this receiver.
    fn methods(methods: &mut Methods<Self>);
}

struct Candidate<R> {
    name: String,
    args: Shape,
    reply: Shape,
    handler: Handler<R>,
}

impl<R> Candidate<R> {
    fn check(&self) -> Result<(), Rejection> {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_uppercase() => {}
            Some(c) if c.is_ascii_alphabetic() || c == '_' => return Err(Rejection::NotExported),
            _ => return Err(Rejection::InvalidName),
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Rejection::InvalidName);
        }
        if !self.args.is_externally_visible() {
            return Err(Rejection::ArgumentNotVisible(self.args));
        }
        if !self.reply.is_externally_visible() {
            return Err(Rejection::ReplyNotVisible(self.reply));
        }
        Ok(())
    }
}

/// Builder collecting the candidate methods of a receiver.
pub struct Methods<R> {
    candidates: Vec<Candidate<R>>,
}

impl<R: Receiver> Methods<R> {
    fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    /// Declare a method.
    ///
    /// The reply starts from `Reply::default()` on every call; the handler
    /// fills it in and signals application failure through its `Err` value.
    pub fn add<A, Rep, E, F>(&mut self, name: &str, method: F) -> &mut Self
    where
        F: Fn(&R, A, &mut Rep) -> Result<(), E> + Send + Sync + 'static,
        A: DeserializeOwned + 'static,
        Rep: Serialize + Default + 'static,
        E: Display,
    {
        let handler: Handler<R> = Arc::new(move |receiver: &R, payload: &[u8], calls: &Mutex<u64>| {
            let mut reply = Rep::default();
            let args: A =
                codec::decode(payload).map_err(|e| DispatchError::Decode(e.to_string()))?;

            let outcome = method(receiver, args, &mut reply);
            *calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;

            outcome.map_err(|e| DispatchError::Application(e.to_string()))?;
            codec::encode(&reply).map_err(|e| DispatchError::Encode(e.to_string()))
        });

        self.candidates.push(Candidate {
            name: name.to_string(),
            args: Shape::of::<A>(),
            reply: Shape::of::<Rep>(),
            handler,
        });
        self
    }
}

/// One remotely callable operation.
pub struct MethodDescriptor {
    name: String,
    args: Shape,
    reply: Shape,
    calls: Mutex<u64>,
    invoke: Invoker,
}

impl MethodDescriptor {
    /// Qualified name (`Service.Method`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument shape, fixed at registration.
    pub fn args(&self) -> Shape {
        self.args
    }

    /// Reply shape, fixed at registration.
    pub fn reply(&self) -> Shape {
        self.reply
    }

    /// Number of times the method has been invoked.
    pub fn call_count(&self) -> u64 {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decode `payload`, invoke the method and encode its reply.
    pub fn invoke(&self, payload: &[u8]) -> Result<Vec<u8>, DispatchError> {
        (self.invoke)(payload, &self.calls)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("reply", &self.reply)
            .field("calls", &self.call_count())
            .finish()
    }
}

#[derive(Default)]
struct Table {
    methods: HashMap<String, Arc<MethodDescriptor>>,
    services: Vec<String>,
}

/// Mapping from qualified name to [`MethodDescriptor`].
#[derive(Default)]
pub struct ServiceRegistry {
    table: RwLock<Table>,
    debug: bool,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that reports every rejected method.
    pub fn with_debug(debug: bool) -> Self {
        Self {
            table: RwLock::default(),
            debug,
        }
    }

    /// Register a receiver under its concrete type name.
    pub fn register<R: Receiver>(&self, receiver: Arc<R>) -> Result<usize, RegistryError> {
        self.register_name(&type_service_name::<R>(), receiver)
    }

    /// Register a receiver under an explicit service name.
    ///
    /// Returns the number of methods exposed. Either every eligible method is
    /// added or, on error, none is.
    pub fn register_name<R: Receiver>(
        &self,
        service: &str,
        receiver: Arc<R>,
    ) -> Result<usize, RegistryError> {
        if service.is_empty() || service.contains('.') {
            return Err(RegistryError::InvalidServiceName(service.to_string()));
        }

        let mut methods = Methods::new();
        R::methods(&mut methods);

        let mut accepted: Vec<Candidate<R>> = Vec::with_capacity(methods.candidates.len());
        for candidate in methods.candidates {
            let verdict = if accepted.iter().any(|c| c.name == candidate.name) {
                Err(Rejection::DuplicateMethod)
            } else {
                candidate.check()
            };
            match verdict {
                Ok(()) => accepted.push(candidate),
                Err(reason) if self.debug => {
                    warn!("{}.{}: {}", service, candidate.name, reason);
                }
                Err(_) => {}
            }
        }

        if accepted.is_empty() {
            return Err(RegistryError::NoSuitableMethods(service.to_string()));
        }

        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        for candidate in &accepted {
            let qualified = format!("{}.{}", service, candidate.name);
            if table.methods.contains_key(&qualified) {
                return Err(RegistryError::DuplicateService(qualified));
            }
        }

        let count = accepted.len();
        for candidate in accepted {
            let qualified = format!("{}.{}", service, candidate.name);
            let receiver = Arc::clone(&receiver);
            let handler = candidate.handler;
            let descriptor = MethodDescriptor {
                name: qualified.clone(),
                args: candidate.args,
                reply: candidate.reply,
                calls: Mutex::new(0),
                invoke: Box::new(move |payload: &[u8], calls: &Mutex<u64>| {
                    handler(receiver.as_ref(), payload, calls)
                }),
            };
            debug!(
                "Registered {} ({} -> {})",
                qualified, descriptor.args, descriptor.reply
            );
            table.methods.insert(qualified, Arc::new(descriptor));
        }
        if !table.services.iter().any(|s| s == service) {
            table.services.push(service.to_string());
        }

        Ok(count)
    }

    /// Look up a method by qualified name.
    pub fn get(&self, qualified: &str) -> Option<Arc<MethodDescriptor>> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.methods.get(qualified).cloned()
    }

    /// Decode `payload`, invoke the named method and encode its reply.
    ///
    /// The registry lock is released before the method runs.
    pub fn dispatch(&self, qualified: &str, payload: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let descriptor = self
            .get(qualified)
            .ok_or_else(|| DispatchError::UnknownMethod(qualified.to_string()))?;
        descriptor.invoke(payload)
    }

    /// Invocation count of a method, if registered.
    pub fn call_count(&self, qualified: &str) -> Option<u64> {
        self.get(qualified).map(|d| d.call_count())
    }

    /// Registered service names in registration order.
    pub fn service_names(&self) -> Vec<String> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.services.clone()
    }

    /// All qualified method names, sorted.
    pub fn method_names(&self) -> Vec<String> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = table.methods.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.methods.len()
    }

    /// Whether no method has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Last path segment of the type name, generics stripped.
fn type_service_name<R>() -> String {
    let full = std::any::type_name::<R>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
