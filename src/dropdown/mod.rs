//! Cascading dropdown protocol.
//!
//! The two target sites speak different widget dialects: DOU uses native
//! `<select>` elements, e-agendas a tokenized combobox library. Everything
//! above this module depends only on the [`DropdownPort`] capability, never
//! on a concrete dialect.
//!
//! ## Module split
//!
//! - `control` - control handles, option entries, label matching
//! - `sentinel` - shared placeholder-option rule
//! - `dialect` - the `DropdownPort` capability trait
//! - `native_select` - native `<select>` dialect (DOU)
//! - `token_widget` - tokenized combobox dialect (e-agendas)
//! - `actor` - selection plus downstream-repopulation wait

pub mod actor;
pub mod control;
pub mod dialect;
pub mod native_select;
pub mod sentinel;
pub mod token_widget;

pub use actor::select_and_wait;
pub use control::{ControlKind, OptionEntry, OptionMatcher, SelectionControl};
pub use dialect::DropdownPort;
pub use native_select::NativeSelectPort;
pub use token_widget::TokenWidgetPort;
