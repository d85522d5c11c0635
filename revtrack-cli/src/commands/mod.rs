pub mod deployed;
pub mod promote;
pub mod resolve;
pub mod seed;
pub mod status;
pub mod tags;
