//  LIB.rs
//    by Lut99
//
//  Created:
//    14 Feb 2023, 11:30:02
//  Last edited:
//    27 Feb 2023, 09:41:55
//  Auto updated?
//    Yes
//
//  Description:
//!   The `klyng-cfg` library provides functions for reading klyng
//!   configuration files: the hosts file that describes where a job may
//!   run, and the file that describes how to reach the beacon.
//

// Declare modules
pub mod errors;
pub mod hosts;
pub mod beacon;
