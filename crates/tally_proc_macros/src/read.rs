use proc_macro2::{Span, TokenStream};
use quote::{ToTokens, quote, quote_spanned};
use syn::{
    Data, DeriveInput, Fields, GenericParam, Generics, Ident,
    parse::{Parse, ParseStream, Result as ParseResult},
    parse_quote,
    spanned::Spanned,
};

pub struct DeriveRead {
    ident: Ident,
    generics: Generics,
    data: Data,
}

impl Parse for DeriveRead {
    fn parse(input: ParseStream) -> ParseResult<Self> {
        let DeriveInput {
            ident,
            mut generics,
            data,
            ..
        } = input.parse()?;
        if let Data::Enum(_) | Data::Union(_) = data {
            return Err(input.error("Read can only be derived for structs"));
        }
        for param in &mut generics.params {
            if let GenericParam::Type(ref mut type_param) = *param {
                type_param
                    .bounds
                    .push(parse_quote!(tally_serialization::Read));
            }
        }
        Ok(Self {
            ident,
            generics,
            data,
        })
    }
}

impl ToTokens for DeriveRead {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let name = &self.ident;
        let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();
        let reads = match &self.data {
            Data::Struct(data) => match data.fields {
                Fields::Named(ref fields) => {
                    let field_reads = fields.named.iter().map(|f| {
                        let ident = &f.ident;
                        let ty = &f.ty;
                        quote_spanned! {f.span() =>
                            let #ident = <#ty as tally_serialization::Read>::read(bytes, pos)?;
                        }
                    });
                    let field_names = fields.named.iter().map(|f| &f.ident);
                    quote! {
                        #(#field_reads)*
                        Ok(#name { #(#field_names,)* })
                    }
                }
                Fields::Unnamed(ref fields) => {
                    let idents: Vec<Ident> = (0..fields.unnamed.len())
                        .map(|i| Ident::new(&format!("field_{}", i), Span::call_site()))
                        .collect();
                    let field_reads = fields.unnamed.iter().zip(&idents).map(|(f, ident)| {
                        let ty = &f.ty;
                        quote_spanned! {f.span() =>
                            let #ident = <#ty as tally_serialization::Read>::read(bytes, pos)?;
                        }
                    });
                    quote! {
                        #(#field_reads)*
                        Ok(#name(#(#idents,)*))
                    }
                }
                Fields::Unit => quote! {
                    Ok(#name)
                },
            },
            // rejected in parse
            Data::Enum(_) | Data::Union(_) => quote! {},
        };

        let expanded = quote! {
            #[automatically_derived]
            #[allow(unused_qualifications)]
            impl #impl_generics tally_serialization::Read for #name #ty_generics #where_clause {
                #[inline]
                fn read(bytes: &[u8], pos: &mut usize) -> Result<Self, tally_serialization::ReadError> {
                    #reads
                }
            }
        };
        expanded.to_tokens(tokens);
    }
}
