//  BEACON.rs
//    by Lut99
//
//  Created:
//    20 Feb 2023, 14:36:18
//  Last edited:
//    27 Feb 2023, 10:20:49
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the commands that bring the beacon up or down.
//

use log::debug;

pub use crate::errors::BeaconError as Error;
use crate::link::BeaconLink;


/***** TESTS *****/





/***** LIBRARY *****/
/// Makes sure the beacon is running, starting it if it isn't.
///
/// # Arguments
/// - `link`: The BeaconLink to the beacon to bring up.
///
/// # Errors
/// This function errors if the beacon was not running and could not be started.
pub async fn up(link: &mut impl BeaconLink) -> Result<(), Error> {
    let res: Result<(), Error> = if link.probe().await {
        println!("The beacon is already up and listening.");
        Ok(())
    } else {
        debug!("Beacon not reachable; starting it");
        if link.start().await {
            println!("The beacon is now up and listening.");
            Ok(())
        } else {
            Err(Error::StartFailed)
        }
    };
    link.release();
    res
}



/// Tells the beacon to go down, if it's running.
///
/// # Arguments
/// - `link`: The BeaconLink to the beacon to take down.
///
/// # Errors
/// This function errors if the beacon is running but refused to stop.
pub async fn down(link: &mut impl BeaconLink) -> Result<(), Error> {
    let res: Result<(), Error> = if !link.probe().await {
        println!("The beacon is not up.");
        Ok(())
    } else if link.stop().await {
        println!("The beacon is now down.");
        Ok(())
    } else {
        Err(Error::StopFailed)
    };
    link.release();
    res
}
