use proc_macro::TokenStream;
use quote::quote;
use syn::{token::{Brace, Paren}, *};

macro_rules! error {
    ($($tt:tt)*) => {
        return Err(syn::Error::new(proc_macro::Span::call_site().into(), format!($($tt)*)))
    };
}

pub fn from_record(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput { attrs: _, vis: _, ident, mut generics, data } = input;
    let Data::Struct(data) = data else {
        error!("only struct are supported")
    };

    let mut output = quote! {};

    match data.fields {
        Fields::Unnamed(FieldsUnnamed { unnamed, .. }) => {
            let body = (0..unnamed.len())
                .map(|i| quote! { record.take(#i)?, });
            Paren::default().surround(&mut output, |e| e.extend(body));
        },
        Fields::Named(FieldsNamed { named, .. }) => {
            let body = named
                .into_iter()
                .filter_map(|e| e.ident)
                .enumerate()
                .map(|(i, id)| (id.to_string(), id, i))
                .map(|(name, id, i)| quote! { #id: record.take_field(#name, #i)?, });
            Brace::default().surround(&mut output, |e| e.extend(body));
        }
        Fields::Unit => {}
    };

    for ty in generics.type_params_mut() {
        ty.bounds.push(syn::parse_quote!(::pgcast::FromValue));
    }

    let (g1, g2, g3) = generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #g1 ::pgcast::FromRecord for #ident #g2 #g3 {
            #[allow(unused_mut, unused_variables)]
            fn from_record(mut record: ::pgcast::Record) -> Result<Self, ::pgcast::DecodeError> {
                Ok(Self #output)
            }
        }

        #[automatically_derived]
        impl #g1 ::pgcast::FromValue for #ident #g2 #g3 {
            fn from_value(value: ::pgcast::Value) -> Result<Self, ::pgcast::DecodeError> {
                <::pgcast::Record as ::pgcast::FromValue>::from_value(value)
                    .and_then(<Self as ::pgcast::FromRecord>::from_record)
            }
        }
    }.into())
}
