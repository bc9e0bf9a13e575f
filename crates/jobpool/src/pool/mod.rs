mod dispatcher;
mod worker;


pub use dispatcher::*;
pub use worker::*;
