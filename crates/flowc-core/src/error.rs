//! Error types for the control plane.
//!
//! [`FlowcError`] covers translation, cache and streaming failures and maps
//! onto gRPC status codes so the ADS layer can surface it directly.

/// Error type for every flowc operation.
///
/// # Example
///
/// ```rust
/// use flowc_core::FlowcError;
///
/// fn check_weight(weight: u32) -> Result<(), FlowcError> {
///     if weight > 100 {
///         return Err(FlowcError::validation(
///             "deployment.canary.canary_weight",
///             format!("must be within [0, 100], got {weight}"),
///         ));
///     }
///     Ok(())
/// }
///
/// assert!(check_weight(150).unwrap_err().is_client_error());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum FlowcError {
    /// Input violates a contract (empty name, bad weight, undeclared parameter).
    #[error("validation failed for {field}: {reason}")]
    Validation {
        /// The offending field or subject.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A strategy could not produce a resource.
    #[error("translation failed in {phase}: {reason}")]
    Translation {
        /// Pipeline phase or strategy that failed.
        phase: String,
        /// Error message.
        reason: String,
    },

    /// A proposed snapshot would break referential integrity.
    #[error("inconsistent snapshot for node {node_id}: {reason}")]
    Consistency {
        /// Node the snapshot was built for.
        node_id: String,
        /// Which reference is dangling.
        reason: String,
    },

    /// The snapshot cache refused an update.
    #[error("cache error: {message}")]
    Cache {
        /// Description of the cache error.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// ADS stream I/O failure.
    #[error("stream error: {message}")]
    Stream {
        /// Error message.
        message: String,
    },

    /// Strategy or server configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No state is known for the node.
    #[error("node not found: {node_id}")]
    NodeNotFound {
        /// The unknown node.
        node_id: String,
    },

    /// The node has no deployment with this id.
    #[error("deployment {deployment_id} not found on node {node_id}")]
    DeploymentNotFound {
        /// Node that was searched.
        node_id: String,
        /// The unknown deployment.
        deployment_id: String,
    },

    /// Protobuf encoding failed.
    #[error("encoding error for {type_url}: {message}")]
    Encoding {
        /// The type URL being encoded.
        type_url: String,
        /// Error message.
        message: String,
    },

    /// Server is shutting down.
    #[error("server is shutting down")]
    Shutdown,

    /// Unexpected internal error.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FlowcError {
    /// Validation error for `field`.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Translation error raised in `phase`.
    pub fn translation(phase: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Translation {
            phase: phase.into(),
            reason: reason.into(),
        }
    }

    /// Consistency error for `node_id`.
    pub fn consistency(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Consistency {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Cache error without an underlying cause.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }

    /// Internal error with no underlying cause.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Internal error wrapping `source`.
    pub fn internal_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the caller supplied bad input (as opposed to a server fault).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::Configuration(_)
                | Self::NodeNotFound { .. }
                | Self::DeploymentNotFound { .. }
                | Self::Consistency { .. }
        )
    }
}

impl From<FlowcError> for tonic::Status {
    fn from(err: FlowcError) -> Self {
        match &err {
            FlowcError::Validation { .. } | FlowcError::Configuration(_) => {
                tonic::Status::invalid_argument(err.to_string())
            }
            FlowcError::NodeNotFound { .. } | FlowcError::DeploymentNotFound { .. } => {
                tonic::Status::not_found(err.to_string())
            }
            FlowcError::Consistency { .. } => tonic::Status::failed_precondition(err.to_string()),
            FlowcError::Stream { .. } | FlowcError::Shutdown => {
                tonic::Status::unavailable(err.to_string())
            }
            FlowcError::Translation { .. }
            | FlowcError::Cache { .. }
            | FlowcError::Encoding { .. }
            | FlowcError::Internal { .. } => tonic::Status::internal(err.to_string()),
        }
    }
}
