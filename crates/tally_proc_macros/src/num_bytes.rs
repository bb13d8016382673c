use proc_macro2::{Span, TokenStream};
use quote::{ToTokens, quote, quote_spanned};
use syn::{
    Data, DeriveInput, Fields, GenericParam, Generics, Ident, Index,
    parse::{Parse, ParseStream, Result as ParseResult},
    parse_quote,
    spanned::Spanned,
};

pub struct DeriveNumBytes {
    ident: Ident,
    generics: Generics,
    data: Data,
}

impl Parse for DeriveNumBytes {
    fn parse(input: ParseStream) -> ParseResult<Self> {
        let DeriveInput {
            ident,
            mut generics,
            data,
            ..
        } = input.parse()?;
        if let Data::Enum(_) | Data::Union(_) = data {
            return Err(input.error("NumBytes can only be derived for structs"));
        }
        for param in &mut generics.params {
            if let GenericParam::Type(ref mut type_param) = *param {
                type_param
                    .bounds
                    .push(parse_quote!(tally_serialization::NumBytes));
            }
        }
        Ok(Self {
            ident,
            generics,
            data,
        })
    }
}

impl ToTokens for DeriveNumBytes {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let name = &self.ident;
        let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();
        let add_to_count = match &self.data {
            Data::Struct(data) => match data.fields {
                Fields::Named(ref fields) => {
                    let recurse = fields.named.iter().map(|f| {
                        let field = &f.ident;
                        quote_spanned! { f.span() =>
                            count += tally_serialization::NumBytes::num_bytes(&self.#field);
                        }
                    });
                    quote! { #(#recurse)* }
                }
                Fields::Unnamed(ref fields) => {
                    let recurse = fields.unnamed.iter().enumerate().map(|(i, f)| {
                        let index = Index {
                            index: i as u32,
                            span: Span::call_site(),
                        };
                        quote_spanned! { f.span() =>
                            count += tally_serialization::NumBytes::num_bytes(&self.#index);
                        }
                    });
                    quote! { #(#recurse)* }
                }
                Fields::Unit => quote! {},
            },
            Data::Enum(_) | Data::Union(_) => quote! {},
        };

        let expanded = quote! {
            #[automatically_derived]
            #[allow(unused_qualifications)]
            impl #impl_generics tally_serialization::NumBytes for #name #ty_generics #where_clause {
                #[inline]
                fn num_bytes(&self) -> usize {
                    #[allow(unused_mut)]
                    let mut count = 0;
                    #add_to_count
                    count
                }
            }
        };
        expanded.to_tokens(tokens);
    }
}
