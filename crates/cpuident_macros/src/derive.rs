use proc_macro2::*;
use quote::quote;
use syn::{punctuated::Punctuated, token::Comma, *};

/// Split a derive input into the enum name and its variants, or return the compile error to emit.
fn parse_enum(item: TokenStream, derive_name: &str) -> core::result::Result<(Ident, Punctuated<Variant, Comma>), TokenStream> {
	let input_parsed = match syn::parse2::<DeriveInput>(item) {
	    Ok(derived_input) => derived_input,
	    Err(err) => return Err(err.to_compile_error()),
	};

	let body_data = match input_parsed.data {
		Data::Enum(body) => body,
		_ => {
			let msg = format!("{derive_name} can only be derived for enums");
			return Err(quote!( compile_error!(#msg); ));
		}
	};

	if let Some(variant) = body_data.variants.iter().find(|variant| !matches!(variant.fields, Fields::Unit)) {
		let msg = format!("{derive_name} does not support variants with fields ('{}')", variant.ident);
		return Err(quote!( compile_error!(#msg); ));
	}

	Ok((input_parsed.ident, body_data.variants))
}

/// Get the string literal of the first `#[name("...")]` attribute on a variant.
fn string_attr(variant: &Variant, name: &str) -> Option<core::result::Result<String, TokenStream>> {
	variant.attrs.iter()
		.find(|attr| attr.path().is_ident(name))
		.map(|attr| attr.parse_args::<LitStr>().map(|lit| lit.value()).map_err(|err| err.to_compile_error()))
}

pub fn enum_count(item: TokenStream) -> TokenStream {
	let (ident, variants) = match parse_enum(item, "EnumCount") {
		Ok(parsed) => parsed,
		Err(err) => return err,
	};
	let count = variants.len();

	quote!{
		impl cpuident_base::EnumCountT for #ident {
			const COUNT: usize = #count;
		}
	}
}

pub fn enum_index(item: TokenStream) -> TokenStream {
	let (ident, body) = match parse_enum(item, "EnumIndex") {
		Ok(parsed) => parsed,
		Err(err) => return err,
	};

	let mut variants = Vec::with_capacity(body.len());
	let mut indices = Vec::with_capacity(body.len());
	let mut i = 0usize;
	for variant in body {
		let idx = match &variant.discriminant {
			Some((_, Expr::Lit(ExprLit { lit: Lit::Int(int), .. }))) => match int.base10_parse::<usize>() {
				Ok(int) => int,
				Err(err) => {
					let msg = err.to_string();
					return quote!(compile_error!(#msg));
				},
			},
			Some(_) => return quote!(compile_error!("Only integer literal discriminants are supported by EnumIndex")),
			None => i,
		};

		variants.push(variant.ident);
		indices.push(idx);
		i = idx + 1;
	}

	quote!{
		impl cpuident_base::EnumIndexT for #ident {
			fn from_idx(idx: usize) -> Option<Self> {
				match idx {
					#(#indices => Some(Self::#variants),)*
					_ => None,
				}
			}

			fn to_idx(self) -> usize {
				match self {
					#(Self::#variants => #indices,)*
				}
			}
		}
	}
}

pub fn enum_display(item: TokenStream) -> TokenStream {
	let (ident, body) = match parse_enum(item, "EnumDisplay") {
		Ok(parsed) => parsed,
		Err(err) => return err,
	};

	let mut members = Vec::with_capacity(body.len());
	let mut names = Vec::with_capacity(body.len());
	for variant in &body {
		let name = match string_attr(variant, "display") {
			Some(Ok(name)) => name,
			Some(Err(err)) => return err,
			None => variant.ident.to_string(),
		};
		members.push(variant.ident.clone());
		names.push(name);
	}

	quote!{
		impl core::fmt::Display for #ident {
			fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
				match self {
					#(#ident::#members => f.pad(#names),)*
				}
			}
		}
	}
}

pub fn enum_from_name(item: TokenStream) -> TokenStream {
	let (ident, body) = match parse_enum(item, "EnumFromName") {
		Ok(parsed) => parsed,
		Err(err) => return err,
	};

	let mut members = Vec::with_capacity(body.len());
	let mut names = Vec::with_capacity(body.len());
	for variant in &body {
		let name = match string_attr(variant, "parse_name").or_else(|| string_attr(variant, "display")) {
			Some(Ok(name)) => name,
			Some(Err(err)) => return err,
			None => variant.ident.to_string(),
		};
		members.push(variant.ident.clone());
		names.push(name);
	}

	quote!{
		impl cpuident_base::EnumFromNameT for #ident {
			fn parse(s: &str) -> Option<Self> {
				#(
					if s.eq_ignore_ascii_case(#names) {
						return Some(Self::#members);
					}
				)*
				None
			}
		}
	}
}
