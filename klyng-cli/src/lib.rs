//  LIB.rs
//    by Lut99
//
//  Created:
//    15 Feb 2023, 09:12:47
//  Last edited:
//    03 Mar 2023, 10:26:03
//  Auto updated?
//    Yes
//
//  Description:
//!   The `klyng-cli` library: everything the `klyng` binary needs to talk
//!   to the beacon and see a job through.
//

// Declare modules
pub mod errors;
pub mod spec;
pub mod link;
pub mod launch;
pub mod monitor;
pub mod run;
pub mod beacon;
#[cfg(test)]
pub mod dummy;
