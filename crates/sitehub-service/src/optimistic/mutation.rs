//! Mutations accepted by the optimistic engine and per-call options.

use std::fmt;

use serde_json::{Value, json};

use sitehub_core::error::AppError;
use sitehub_entity::{ActionType, Entity};

/// A change to apply locally before the server confirms it.
#[derive(Debug, Clone)]
pub enum Mutation<T: Entity> {
    /// Prepend a new record carrying a client-side placeholder id.
    Create(T),
    /// Merge a JSON object patch into the record.
    Update {
        /// Target record.
        id: T::Id,
        /// Fields to overwrite.
        patch: Value,
    },
    /// Move the record to another workflow state.
    StatusChange {
        /// Target record.
        id: T::Id,
        /// New state.
        status: T::Status,
    },
    /// Remove the record.
    Delete {
        /// Target record.
        id: T::Id,
    },
}

impl<T: Entity> Mutation<T> {
    /// The pending action type this mutation is tracked as.
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Create(_) => ActionType::Create,
            Self::Update { .. } => ActionType::Update,
            Self::StatusChange { .. } => ActionType::StatusChange,
            Self::Delete { .. } => ActionType::Delete,
        }
    }

    /// Id of the record the mutation targets.
    pub fn entity_id(&self) -> T::Id {
        match self {
            Self::Create(item) => item.id(),
            Self::Update { id, .. } | Self::StatusChange { id, .. } | Self::Delete { id } => *id,
        }
    }

    /// Payload as dispatched, recorded on the pending action.
    pub fn payload(&self) -> Value {
        match self {
            Self::Create(item) => serde_json::to_value(item).unwrap_or(Value::Null),
            Self::Update { patch, .. } => patch.clone(),
            Self::StatusChange { status, .. } => json!({ "status": status }),
            Self::Delete { id } => json!({ "id": id }),
        }
    }
}

type SuccessHook<T> = Box<dyn FnOnce(&T) + Send>;
type ErrorHook = Box<dyn FnOnce(&AppError) + Send>;

/// Per-call notification text and completion hooks.
pub struct ActionOptions<T> {
    /// Message of the success notification. Defaults to "<Label> <verb>".
    pub success_message: Option<String>,
    /// Prefix of the error notification. Defaults to the error message alone.
    pub error_message: Option<String>,
    /// Skip notifications for this call.
    pub silent: bool,
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook>,
}

impl<T> Default for ActionOptions<T> {
    fn default() -> Self {
        Self {
            success_message: None,
            error_message: None,
            silent: false,
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> fmt::Debug for ActionOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionOptions")
            .field("success_message", &self.success_message)
            .field("error_message", &self.error_message)
            .field("silent", &self.silent)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl<T> ActionOptions<T> {
    /// Options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the success notification text.
    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    /// Set the error notification prefix.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Suppress notifications.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Run `hook` with the confirmed record on success.
    pub fn on_success(mut self, hook: impl FnOnce(&T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Run `hook` with the error on failure.
    pub fn on_error(mut self, hook: impl FnOnce(&AppError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub(crate) fn take_on_success(&mut self) -> Option<SuccessHook<T>> {
        self.on_success.take()
    }

    pub(crate) fn take_on_error(&mut self) -> Option<ErrorHook> {
        self.on_error.take()
    }
}
