//! Derive macros for the statically enumerated value sets used throughout cpuident.
//! 
//! All derives only accept field-less enums, the generated code refers to the traits in `cpuident_base`.

use proc_macro::TokenStream;

mod derive;

/// Implement `cpuident_base::EnumCountT` for an enum.
#[proc_macro_derive(EnumCount)]
pub fn enum_count(item: TokenStream) -> TokenStream {
    derive::enum_count(item.into()).into()
}

/// Implement `cpuident_base::EnumIndexT` for an enum.
#[proc_macro_derive(EnumIndex)]
pub fn enum_index(item: TokenStream) -> TokenStream {
    derive::enum_index(item.into()).into()
}

/// Implement `core::fmt::Display` for an enum, using `#[display("...")]` when present.
#[proc_macro_derive(EnumDisplay, attributes(display))]
pub fn enum_display(item: TokenStream) -> TokenStream {
    derive::enum_display(item.into()).into()
}

/// Implement `cpuident_base::EnumFromNameT` for an enum.
/// 
/// Names are taken from `#[parse_name("...")]`, then `#[display("...")]`, then the variant identifier, and are matched case-insensitively.
#[proc_macro_derive(EnumFromName, attributes(parse_name, display))]
pub fn enum_from_name(item: TokenStream) -> TokenStream {
    derive::enum_from_name(item.into()).into()
}
