//! Generated tfplugin6 protocol bindings

#![allow(clippy::all)]

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));
