//! Domain logic of the tool host.
//!
//! Everything about tools (what they are, where they come from and how they
//! are invoked) lives under [`tools`]; transports only marshal.

pub mod tools;
