//  LIB.rs
//    by Lut99
//
//  Created:
//    14 Feb 2023, 10:09:12
//  Last edited:
//    02 Mar 2023, 15:58:40
//  Auto updated?
//    Yes
//
//  Description:
//!   The `specifications` crate defines the vocabulary that the klyng
//!   client and the beacon use to talk to each other.
//

// Declare modules
pub mod beacon;
