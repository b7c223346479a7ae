//! Solidity interface definitions of both escrow deployments.
//!
//! - [`IPaymentEscrowCalldataOptimized`] takes payment terms as typed arguments
//!   and identifies a registered payment by its positional hash.
//! - [`IPaymentEscrowGasOptimized`] takes the ABI-encoded payment details as
//!   `bytes` on every call and rehashes them on-chain.
//!
//! Both emit the same events and revert with the same custom errors.

use alloy_sol_types::sol;

sol! {
    /// Calldata-optimized payment escrow.
    #[allow(missing_docs)]
    #[allow(clippy::too_many_arguments)]
    #[derive(Debug)]
    interface IPaymentEscrowCalldataOptimized {
        struct PaymentDetails {
            address operator;
            address buyer;
            address token;
            address captureAddress;
            uint256 value;
            uint48 captureDeadline;
            address feeRecipient;
            uint16 feeBps;
        }

        event PaymentAuthorized(bytes32 indexed paymentDetailsHash, uint256 value);
        event PaymentCaptured(bytes32 indexed paymentDetailsHash, uint256 value);
        event PaymentCharged(bytes32 indexed paymentDetailsHash, uint256 value);
        event PaymentRefunded(bytes32 indexed paymentDetailsHash, address indexed refunder, uint256 value);
        event PaymentVoided(bytes32 indexed paymentDetailsHash);

        error AfterCaptureDeadline(uint48 timestamp, uint48 deadline);
        error BeforeCaptureDeadline(uint48 timestamp, uint48 deadline);
        error FeeBpsOverflow(uint16 feeBps);
        error InsufficientAuthorization(bytes32 paymentDetailsHash, uint256 authorizedValue, uint256 requestedValue);
        error InvalidSender(address sender);
        error PaymentNotRegistered(bytes32 paymentHash);
        error PermissionApprovalFailed();
        error RefundExceedsCapture(uint256 refund, uint256 captured);
        error ValueLimitExceeded(uint256 value);
        error VoidAuthorization(bytes32 paymentDetailsHash);
        error ZeroFeeRecipient();
        error ZeroValue();

        function authorize(
            uint256 salt,
            PaymentDetails calldata details,
            uint256 validAfter,
            uint256 validBefore,
            uint256 value,
            bytes calldata signature
        ) external;
        function capture(bytes32 paymentHash, uint256 value) external;
        function charge(
            uint256 salt,
            PaymentDetails calldata details,
            uint256 value,
            bytes calldata signature
        ) external;
        function refund(bytes32 paymentHash, uint256 value) external;
        function void(bytes32 paymentHash) external;
    }
}

sol! {
    /// Gas-optimized payment escrow.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IPaymentEscrowGasOptimized {
        event PaymentAuthorized(bytes32 indexed paymentDetailsHash, uint256 value);
        event PaymentCaptured(bytes32 indexed paymentDetailsHash, uint256 value);
        event PaymentCharged(bytes32 indexed paymentDetailsHash, uint256 value);
        event PaymentRefunded(bytes32 indexed paymentDetailsHash, address indexed refunder, uint256 value);
        event PaymentVoided(bytes32 indexed paymentDetailsHash);

        error AfterCaptureDeadline(uint48 timestamp, uint48 deadline);
        error BeforeCaptureDeadline(uint48 timestamp, uint48 deadline);
        error FeeBpsOverflow(uint16 feeBps);
        error InsufficientAuthorization(bytes32 paymentDetailsHash, uint256 authorizedValue, uint256 requestedValue);
        error InvalidSender(address sender);
        error PermissionApprovalFailed();
        error RefundExceedsCapture(uint256 refund, uint256 captured);
        error ValueLimitExceeded(uint256 value);
        error VoidAuthorization(bytes32 paymentDetailsHash);
        error ZeroFeeRecipient();
        error ZeroValue();

        function authorize(uint256 value, bytes calldata paymentDetails, bytes calldata signature) external;
        function capture(uint256 value, bytes calldata paymentDetails) external;
        function charge(uint256 value, bytes calldata paymentDetails, bytes calldata signature) external;
        function refund(uint256 value, bytes calldata paymentDetails) external;
        function void(bytes calldata paymentDetails) external;
    }
}
