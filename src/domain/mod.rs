// Domain layer - Plain data types shared by every other layer
pub mod command;
pub mod readout;
pub mod sample;
