//! Procedural macros for uniflow

use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any, struct_any))]
struct ActionOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<ActionVariant, darling::util::Ignored>,

    /// Name reported for struct actions (defaults to the struct name)
    #[darling(default)]
    name: Option<String>,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<darling::util::Ignored>,

    /// Explicit name override
    #[darling(default)]
    name: Option<String>,
}

/// Derive macro for the Action trait
///
/// Generates a `name()` method that returns the variant name as a static
/// string. Log filters and tracing events match against this name.
///
/// A variant can report a different name with `#[action(name = "...")]`.
/// Structs report their own type name, or the container-level override.
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// enum StopwatchAction {
///     StartTapped,
///     StopTapped,
///     #[action(name = "Tick")]
///     TimerTicked,
///     Lap { index: usize },
/// }
///
/// assert_eq!(StopwatchAction::StartTapped.name(), "StartTapped");
/// assert_eq!(StopwatchAction::TimerTicked.name(), "Tick");
/// assert_eq!(StopwatchAction::Lap { index: 2 }.name(), "Lap");
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let body: TokenStream2 = match &opts.data {
        darling::ast::Data::Enum(variants) => {
            if variants.is_empty() {
                return syn::Error::new_spanned(&input, "Action cannot be derived for empty enums")
                    .to_compile_error()
                    .into();
            }

            let name_arms = variants.iter().map(|v| {
                let variant_name = &v.ident;
                let variant_str = v.name.clone().unwrap_or_else(|| variant_name.to_string());

                match &v.fields.style {
                    darling::ast::Style::Unit => quote! {
                        #name::#variant_name => #variant_str
                    },
                    darling::ast::Style::Tuple => quote! {
                        #name::#variant_name(..) => #variant_str
                    },
                    darling::ast::Style::Struct => quote! {
                        #name::#variant_name { .. } => #variant_str
                    },
                }
            });

            quote! {
                match self {
                    #(#name_arms),*
                }
            }
        }
        darling::ast::Data::Struct(_) => {
            let struct_str = opts.name.clone().unwrap_or_else(|| name.to_string());
            quote! { #struct_str }
        }
    };

    let expanded = quote! {
        impl #impl_generics ::uniflow::Action for #name #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                #body
            }
        }
    };

    TokenStream::from(expanded)
}
