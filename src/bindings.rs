//! Solidity contract ABI bindings for the ERC20 token, the Aave V2
//! lending pool, and the credit delegation helper.
//!
//! Each binding also exposes its dynamic ABI (`Name::abi::contract()`),
//! which the log decoder uses to match events it did not see at compile
//! time.

use alloy::sol;

sol!(
    #![sol(all_derives = true, rpc, abi)]
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address recipient, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transferFrom(address sender, address recipient, uint256 amount) external returns (bool);
    }
);

// Aave V2 `ILendingPool`, reduced to the events a deposit can emit.
sol!(
    #![sol(all_derives = true, rpc, abi)]
    interface ILendingPool {
        event Deposit(
            address indexed reserve,
            address user,
            address indexed onBehalfOf,
            uint256 amount,
            uint16 indexed referral
        );
        event Withdraw(
            address indexed reserve,
            address indexed user,
            address indexed to,
            uint256 amount
        );
        event Borrow(
            address indexed reserve,
            address user,
            address indexed onBehalfOf,
            uint256 amount,
            uint256 borrowRateMode,
            uint256 borrowRate,
            uint16 indexed referral
        );
        event Repay(
            address indexed reserve,
            address indexed user,
            address indexed repayer,
            uint256 amount
        );
        event ReserveUsedAsCollateralEnabled(address indexed reserve, address indexed user);
        event ReserveUsedAsCollateralDisabled(address indexed reserve, address indexed user);
        event ReserveDataUpdated(
            address indexed reserve,
            uint256 liquidityRate,
            uint256 stableBorrowRate,
            uint256 variableBorrowRate,
            uint256 liquidityIndex,
            uint256 variableBorrowIndex
        );
    }
);

// Mirrors `contracts/MyV2CreditDelegation.sol`. The deployable bytecode and
// the authoritative ABI come from the compiled artifact at runtime.
sol!(
    #![sol(all_derives = true, rpc, abi)]
    interface IMyV2CreditDelegation {
        function depositCollateral(address asset, uint256 amount, bool isPull) external;
    }
);

// Test contracts assembled from the listings in `contracts/test/` with
// `contracts/test/assemble.py`.

#[cfg(test)]
sol!(
    #![sol(all_derives = true, rpc)]
    #[sol(bytecode = "6102148061000d6000396000f360003560e01c806370a0823114610058578063dd62ed3e14610072578063095ea7b3146100a6578063a9059cbb1461010157806323b872dd1461011357806340c10f191461015357806318160ddd1461009a575b600080fd5b600435600052600060205260406000205460005260206000f35b6024356004356000526001602052604060002060205260005260406000205460005260206000f35b60025460005260206000f35b6024356004353360005260016020526040600020602052600052604060002055602435600052600435337f8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b92560206000a3600160005260206000f35b336004356024356101df9291906101aa565b33600435600052600160205260406000206020526000526040600020805460443581811161005357900390556004356024356044356101df9291906101aa565b60243560025401600255602435600435600052600060205260406000208054820190555060243560005260043560007fddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef60206000a3005b826000526000602052604060002080548281811161005357900390558082600052600060205260406000208054820190555092565b916000527fddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef60206000a3600160005260206000f3")]
    contract TestERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function mint(address to, uint256 amount) external;
    }
);

// Installed at the Aave V2 lending pool address with `anvil_setCode`.
#[cfg(test)]
sol!(
    #![sol(all_derives = true, rpc)]
    #[sol(deployed_bytecode = "60003560e01c8063e8eda9df14610016575b600080fd5b7f23b872dd000000000000000000000000000000000000000000000000000000006000523360045230602452602435604452602060006064600060006004355af1156100115760005115610011576044356004357f00058a56ea94653cdf4f152d227ace22d4c00ad99e2a43f58cb7d9e3feb295f260006000a3336000526024356020526064356044356004357fde6857219544bb5b7746f48ed30be6386fefc61b2f864cacf559893bf50fd95160406000a400")]
    contract TestLendingPool {
        function deposit(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
    }
);

// Same entry point, pool address and pull-approve-deposit sequence as
// `contracts/MyV2CreditDelegation.sol`.
#[cfg(test)]
sol!(
    #![sol(all_derives = true, rpc, abi)]
    #[sol(bytecode = "6101868061000d6000396000f360003560e01c8063e5feb7811461001557600080fd5b6044351561006c577f23b872dd000000000000000000000000000000000000000000000000000000006000523360045230602452602435604452602060006064600060006004355af115610123576000511561012e575b7f095ea7b30000000000000000000000000000000000000000000000000000000060005273e0fba4fc209b4948668006b2be61711b7f465bae600452602435602452602060006044600060006004355af115610123577fe8eda9df000000000000000000000000000000000000000000000000000000006000526004356004526024356024523060445260006064526000600060846000600073e0fba4fc209b4948668006b2be61711b7f465bae5af11561012357005b3d600060003e3d6000fd5b7f08c379a0000000000000000000000000000000000000000000000000000000006000526020600452600b6024527f70756c6c206661696c656400000000000000000000000000000000000000000060445260646000fd")]
    contract TestCreditDelegation {
        function depositCollateral(address asset, uint256 amount, bool isPull) external;
    }
);
