#![allow(dead_code)]

pub mod cloud;
pub mod project;
