// Copyright 2021 The gsgp developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate approx;

pub mod annotation;
pub mod attribution;
pub mod candidates;
pub mod cli;
pub mod errors;
pub mod output;
pub mod reference;
pub mod signatures;
pub mod spectrum;
pub mod utils;
pub mod variants;
