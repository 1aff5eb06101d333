//! Unified error codes for the store
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Customer errors
//! - 4xxx: Order errors
//! - 5xxx: Inventory errors
//! - 6xxx: Product errors
//! - 7xxx: Category errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so clients can match on
/// them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1007,
    /// Email is already registered
    EmailExists = 1008,
    /// Password too short
    PasswordTooShort = 1009,
    /// Too many requests from this client
    RateLimited = 1010,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Staff (admin) role required
    AdminRequired = 2003,

    // ==================== 3xxx: Customer ====================
    /// Customer not found
    CustomerNotFound = 3001,
    /// Customer email already in use
    CustomerEmailExists = 3002,
    /// Customer still has orders
    CustomerHasOrders = 3003,
    /// Authenticated user has no customer profile
    CustomerProfileMissing = 3004,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no items
    OrderEmpty = 4002,
    /// Item quantity must be positive
    InvalidQuantity = 4003,
    /// Status change not allowed from the current status
    InvalidStatusTransition = 4004,
    /// Order can no longer be cancelled by this caller
    OrderNotCancellable = 4005,

    // ==================== 5xxx: Inventory ====================
    /// Not enough stock
    InsufficientStock = 5001,
    /// Stock adjustment is invalid (e.g. zero delta)
    InvalidStockAdjustment = 5002,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// SKU already in use
    SkuExists = 6002,
    /// Price is invalid
    InvalidPrice = 6003,
    /// Product is not available for sale
    ProductInactive = 6004,
    /// Product is referenced by orders
    ProductInUse = 6005,

    // ==================== 7xxx: Category ====================
    /// Category not found
    CategoryNotFound = 7001,
    /// Category has child categories
    CategoryHasChildren = 7002,
    /// Category has products
    CategoryHasProducts = 7003,
    /// Category cannot be moved below itself
    CategoryCycle = 7004,
    /// Parent category not found
    ParentCategoryNotFound = 7005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Timeout error
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::EmailExists => "Email is already registered",
            ErrorCode::PasswordTooShort => "Password must be at least 8 characters",
            ErrorCode::RateLimited => "Too many requests, try again later",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Staff privileges are required",

            // Customer
            ErrorCode::CustomerNotFound => "Customer not found",
            ErrorCode::CustomerEmailExists => "Customer email already exists",
            ErrorCode::CustomerHasOrders => "Customer has orders and cannot be deleted",
            ErrorCode::CustomerProfileMissing => "No customer profile for this account",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order must contain at least one item",
            ErrorCode::InvalidQuantity => "Quantity must be greater than zero",
            ErrorCode::InvalidStatusTransition => "Order status change is not allowed",
            ErrorCode::OrderNotCancellable => "Order can no longer be cancelled",

            // Inventory
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::InvalidStockAdjustment => "Invalid stock adjustment",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::SkuExists => "SKU already exists",
            ErrorCode::InvalidPrice => "Price must not be negative",
            ErrorCode::ProductInactive => "Product is not available",
            ErrorCode::ProductInUse => "Product is referenced by orders",

            // Category
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::CategoryHasChildren => "Category has child categories",
            ErrorCode::CategoryHasProducts => "Category has products",
            ErrorCode::CategoryCycle => "Category cannot be moved below itself",
            ErrorCode::ParentCategoryNotFound => "Parent category not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1007 => Ok(ErrorCode::AccountDisabled),
            1008 => Ok(ErrorCode::EmailExists),
            1009 => Ok(ErrorCode::PasswordTooShort),
            1010 => Ok(ErrorCode::RateLimited),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),

            // Customer
            3001 => Ok(ErrorCode::CustomerNotFound),
            3002 => Ok(ErrorCode::CustomerEmailExists),
            3003 => Ok(ErrorCode::CustomerHasOrders),
            3004 => Ok(ErrorCode::CustomerProfileMissing),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderEmpty),
            4003 => Ok(ErrorCode::InvalidQuantity),
            4004 => Ok(ErrorCode::InvalidStatusTransition),
            4005 => Ok(ErrorCode::OrderNotCancellable),

            // Inventory
            5001 => Ok(ErrorCode::InsufficientStock),
            5002 => Ok(ErrorCode::InvalidStockAdjustment),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::SkuExists),
            6003 => Ok(ErrorCode::InvalidPrice),
            6004 => Ok(ErrorCode::ProductInactive),
            6005 => Ok(ErrorCode::ProductInUse),

            // Category
            7001 => Ok(ErrorCode::CategoryNotFound),
            7002 => Ok(ErrorCode::CategoryHasChildren),
            7003 => Ok(ErrorCode::CategoryHasProducts),
            7004 => Ok(ErrorCode::CategoryCycle),
            7005 => Ok(ErrorCode::ParentCategoryNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[ErrorCode] = &[
        ErrorCode::Success,
        ErrorCode::Unknown,
        ErrorCode::ValidationFailed,
        ErrorCode::NotFound,
        ErrorCode::AlreadyExists,
        ErrorCode::InvalidRequest,
        ErrorCode::InvalidFormat,
        ErrorCode::RequiredField,
        ErrorCode::ValueOutOfRange,
        ErrorCode::NotAuthenticated,
        ErrorCode::InvalidCredentials,
        ErrorCode::TokenExpired,
        ErrorCode::TokenInvalid,
        ErrorCode::AccountDisabled,
        ErrorCode::EmailExists,
        ErrorCode::PasswordTooShort,
        ErrorCode::RateLimited,
        ErrorCode::PermissionDenied,
        ErrorCode::AdminRequired,
        ErrorCode::CustomerNotFound,
        ErrorCode::CustomerEmailExists,
        ErrorCode::CustomerHasOrders,
        ErrorCode::CustomerProfileMissing,
        ErrorCode::OrderNotFound,
        ErrorCode::OrderEmpty,
        ErrorCode::InvalidQuantity,
        ErrorCode::InvalidStatusTransition,
        ErrorCode::OrderNotCancellable,
        ErrorCode::InsufficientStock,
        ErrorCode::InvalidStockAdjustment,
        ErrorCode::ProductNotFound,
        ErrorCode::SkuExists,
        ErrorCode::InvalidPrice,
        ErrorCode::ProductInactive,
        ErrorCode::ProductInUse,
        ErrorCode::CategoryNotFound,
        ErrorCode::CategoryHasChildren,
        ErrorCode::CategoryHasProducts,
        ErrorCode::CategoryCycle,
        ErrorCode::ParentCategoryNotFound,
        ErrorCode::InternalError,
        ErrorCode::DatabaseError,
        ErrorCode::NetworkError,
        ErrorCode::TimeoutError,
        ErrorCode::ConfigError,
    ];

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::InvalidCredentials.code(), 1002);
        assert_eq!(ErrorCode::AdminRequired.code(), 2003);
        assert_eq!(ErrorCode::CustomerHasOrders.code(), 3003);
        assert_eq!(ErrorCode::InvalidStatusTransition.code(), 4004);
        assert_eq!(ErrorCode::InsufficientStock.code(), 5001);
        assert_eq!(ErrorCode::SkuExists.code(), 6002);
        assert_eq!(ErrorCode::CategoryCycle.code(), 7004);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_every_code_converts_back() {
        for code in ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(*code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(9999), Err(InvalidErrorCode(9999)));
        assert_eq!(ErrorCode::try_from(2002), Err(InvalidErrorCode(2002)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderNotFound).unwrap();
        assert_eq!(json, "4001");
        let code: ErrorCode = serde_json::from_str("7002").unwrap();
        assert_eq!(code, ErrorCode::CategoryHasChildren);
        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::NotFound.is_success());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::SkuExists.to_string(), "6002");
    }
}
