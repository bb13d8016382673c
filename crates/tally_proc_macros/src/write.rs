use proc_macro2::{Span, TokenStream};
use quote::{ToTokens, quote, quote_spanned};
use syn::{
    Data, DeriveInput, Fields, GenericParam, Generics, Ident, Index,
    parse::{Parse, ParseStream, Result as ParseResult},
    parse_quote,
    spanned::Spanned,
};

pub struct DeriveWrite {
    ident: Ident,
    generics: Generics,
    data: Data,
}

impl Parse for DeriveWrite {
    fn parse(input: ParseStream) -> ParseResult<Self> {
        let DeriveInput {
            ident,
            mut generics,
            data,
            ..
        } = input.parse()?;
        if let Data::Enum(_) | Data::Union(_) = data {
            return Err(input.error("Write can only be derived for structs"));
        }
        for param in &mut generics.params {
            if let GenericParam::Type(ref mut type_param) = *param {
                type_param
                    .bounds
                    .push(parse_quote!(tally_serialization::Write));
            }
        }
        Ok(Self {
            ident,
            generics,
            data,
        })
    }
}

impl ToTokens for DeriveWrite {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let name = &self.ident;
        let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();
        let writes = match &self.data {
            Data::Struct(data) => match data.fields {
                Fields::Named(ref fields) => {
                    let recurse = fields.named.iter().map(|f| {
                        let field = &f.ident;
                        quote_spanned! { f.span() =>
                            tally_serialization::Write::write(&self.#field, bytes, pos)?;
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
                            tally_serialization::Write::write(&self.#index, bytes, pos)?;
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
            impl #impl_generics tally_serialization::Write for #name #ty_generics #where_clause {
                #[inline]
                fn write(&self, bytes: &mut [u8], pos: &mut usize) -> Result<(), tally_serialization::WriteError> {
                    #writes
                    Ok(())
                }
            }
        };

        expanded.to_tokens(tokens);
    }
}
