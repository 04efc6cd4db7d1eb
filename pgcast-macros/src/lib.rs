use proc_macro::TokenStream;
use syn::DeriveInput;

mod from_record;

/// Derive `FromRecord` and `FromValue` for a struct built from a composite value.
///
/// Named fields are taken by name, falling back to their position when the
/// record carries no field names. Tuple struct fields are taken by position.
#[proc_macro_derive(FromRecord)]
pub fn from_record(input: TokenStream) -> TokenStream {
    match from_record::from_record(syn::parse_macro_input!(input as DeriveInput)) {
        Ok(ok) => ok,
        Err(err) => err.into_compile_error().into(),
    }
}
