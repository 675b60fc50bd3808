/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Tests for the acquisition module.

pub mod dispatch;
pub mod support;
