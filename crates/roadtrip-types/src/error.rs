//! Parse errors for domain enums

use thiserror::Error;

/// Error parsing a domain value from its wire representation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unknown plan tier
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Unknown subscription status
    #[error("invalid subscription status: {0}")]
    InvalidStatus(String),

    /// Unknown payment method
    #[error("invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    /// Unknown payment status
    #[error("invalid payment status: {0}")]
    InvalidPaymentStatus(String),

    /// Unknown role
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// Unknown privilege
    #[error("invalid privilege: {0}")]
    InvalidPrivilege(String),

    /// Unknown resource kind
    #[error("invalid resource kind: {0}")]
    InvalidResourceKind(String),

    /// Unknown export format
    #[error("invalid export format: {0}")]
    InvalidExportFormat(String),
}
