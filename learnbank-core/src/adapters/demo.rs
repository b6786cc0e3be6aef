//! Demo fixture data
//!
//! The accounts created when demo mode is enabled. They go through normal
//! registration and approval, so they carry real credential hashes and an
//! opening-grant ledger entry like any other account.

use rust_decimal::Decimal;

/// One demo account to seed
#[derive(Debug, Clone)]
pub struct DemoUser {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub starting_balance: Decimal,
}

/// Generate the demo accounts
pub fn demo_users() -> Vec<DemoUser> {
    vec![
        DemoUser {
            first_name: "Demo",
            last_name: "User",
            email: "demo@learningbank.com",
            password: "demo123",
            starting_balance: Decimal::new(100000, 2), // $1,000.00
        },
        DemoUser {
            first_name: "Alice",
            last_name: "Johnson",
            email: "alice@test.com",
            password: "test123",
            starting_balance: Decimal::new(150000, 2), // $1,500.00
        },
        DemoUser {
            first_name: "Bob",
            last_name: "Smith",
            email: "bob@test.com",
            password: "test123",
            starting_balance: Decimal::new(200000, 2), // $2,000.00
        },
    ]
}
