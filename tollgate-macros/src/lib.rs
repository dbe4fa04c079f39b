use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, ToTokens};
use syn::parse::Parse;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Token};

/// Derives guarded routing for an enum of handler invocations.
///
/// # Usage
///
/// ```ignore
/// #[derive(GuardedRouter)]
/// #[tollgate(state = AppState)]
/// enum UserAction {
///     #[tollgate(handler = handlers::show)]
///     Show(u64),
///
///     #[tollgate(handler = handlers::delete, roles = ["ADMIN", "OWNER"], any_of)]
///     Delete(u64),
/// }
/// ```
///
/// This will generate:
///
/// ```ignore
/// impl UserAction {
///     pub fn guard_config(&self) -> Option<tollgate::GuardConfig> { .. }
///     pub fn guard_registrations() -> Vec<tollgate::GuardRegistration> { .. }
///     pub fn required_facets() -> Vec<tollgate::Facet> { .. }
///
///     pub fn execute(
///         self,
///         state: tollgate::State<AppState>,
///         ctx: &mut tollgate::RequestContext,
///         evaluators: &tollgate::Evaluators,
///     ) -> tollgate::Response {
///         // guard check, then
///         match self {
///             UserAction::Show(a0) => handlers::show(state, ctx, a0).into_response(),
///             UserAction::Delete(a0) => handlers::delete(state, ctx, a0).into_response(),
///         }
///     }
/// }
/// ```
#[proc_macro_derive(GuardedRouter, attributes(tollgate))]
pub fn derive_guarded_router(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum GuardFacet {
    Authority,
    Role,
}

impl ToTokens for GuardFacet {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        tokens.extend(match self {
            GuardFacet::Authority => quote!(::tollgate::Facet::Authority),
            GuardFacet::Role => quote!(::tollgate::Facet::Role),
        });
    }
}

struct GuardAttr {
    facet: GuardFacet,
    tokens: Vec<LitStr>,
    any_of: bool,
}

struct Route {
    variant: syn::Ident,
    handler: syn::Path,
    fields: Vec<syn::Type>,
    guard: Option<GuardAttr>,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let enum_name = &input.ident;
    let state_type = extract_state_type(input)?;

    let data = match &input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                enum_name,
                "GuardedRouter can only be derived for enums",
            ))
        }
    };

    let routes = data
        .variants
        .iter()
        .map(parse_route)
        .collect::<syn::Result<Vec<_>>>()?;

    let config_arms = routes.iter().map(|route| {
        let pattern = wildcard_pattern(enum_name, route);
        let config = guard_config_expr(route.guard.as_ref());
        quote! { #pattern => #config, }
    });

    let registrations = routes.iter().map(|route| {
        let signature = signature_string(route);
        let config = guard_config_expr(route.guard.as_ref());
        quote! {
            ::tollgate::GuardRegistration::new(
                concat!(module_path!(), "::", stringify!(#enum_name)),
                #signature,
                #config,
            )
        }
    });

    let mut facets: Vec<GuardFacet> = routes
        .iter()
        .filter_map(|route| route.guard.as_ref().map(|guard| guard.facet))
        .collect();
    facets.sort();
    facets.dedup();

    let execute_arms = routes.iter().map(|route| {
        let variant = &route.variant;
        let handler = &route.handler;
        let args: Vec<_> = (0..route.fields.len())
            .map(|i| format_ident!("__tollgate_arg{}", i))
            .collect();
        let pattern = if args.is_empty() {
            quote!(#enum_name::#variant)
        } else {
            quote!(#enum_name::#variant(#(#args),*))
        };
        quote! {
            #pattern => #handler(state, ctx #(, #args)*).into_response(),
        }
    });

    Ok(quote! {
        impl #enum_name {
            /// Guard configured for this route, if any.
            pub fn guard_config(&self) -> ::core::option::Option<::tollgate::GuardConfig> {
                match self {
                    #(#config_arms)*
                }
            }

            /// One registration per route, for the diagnostic guard report.
            pub fn guard_registrations() -> ::std::vec::Vec<::tollgate::GuardRegistration> {
                ::std::vec![#(#registrations),*]
            }

            /// Facets whose evaluators must be configured.
            pub fn required_facets() -> ::std::vec::Vec<::tollgate::Facet> {
                ::std::vec![#(#facets),*]
            }

            /// Check the route's guard, then run its handler.
            pub fn execute(
                self,
                state: ::tollgate::State<#state_type>,
                ctx: &mut ::tollgate::RequestContext,
                evaluators: &::tollgate::Evaluators,
            ) -> ::tollgate::Response {
                use ::tollgate::IntoResponse;

                if let ::core::option::Option::Some(config) = self.guard_config() {
                    let checked = match evaluators.guard(config) {
                        ::core::result::Result::Ok(guard) => guard.check(ctx),
                        ::core::result::Result::Err(e) => {
                            ::core::result::Result::Err(::tollgate::AccessError::from(e))
                        }
                    };
                    if let ::core::result::Result::Err(e) = checked {
                        return e.into_response();
                    }
                }

                match self {
                    #(#execute_arms)*
                }
            }
        }
    })
}

/// Extract the state type from #[tollgate(state = T)]
fn extract_state_type(input: &DeriveInput) -> syn::Result<syn::Type> {
    let mut state = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("tollgate")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("state") {
                state = Some(meta.value()?.parse::<syn::Type>()?);
                Ok(())
            } else {
                Err(meta.error("expected `state = YourStateType`"))
            }
        })?;
    }
    state.ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "Missing #[tollgate(state = YourStateType)] attribute on enum",
        )
    })
}

fn parse_route(variant: &syn::Variant) -> syn::Result<Route> {
    let mut handler = None;
    let mut guard: Option<GuardAttr> = None;
    let mut any_of = false;

    for attr in variant.attrs.iter().filter(|a| a.path().is_ident("tollgate")) {
        attr.parse_nested_meta(|meta| {
            let facet = if meta.path.is_ident("handler") {
                handler = Some(meta.value()?.parse::<syn::Path>()?);
                return Ok(());
            } else if meta.path.is_ident("any_of") {
                any_of = true;
                return Ok(());
            } else if meta.path.is_ident("roles") {
                GuardFacet::Role
            } else if meta.path.is_ident("authorities") {
                GuardFacet::Authority
            } else {
                return Err(meta.error("expected `handler`, `roles`, `authorities` or `any_of`"));
            };

            if guard.is_some() {
                return Err(meta.error("only one of `roles` or `authorities` per route"));
            }
            let value = meta.value()?;
            let content;
            syn::bracketed!(content in value);
            let tokens: Vec<LitStr> = content
                .parse_terminated(<LitStr as Parse>::parse, Token![,])?
                .into_iter()
                .collect();
            if tokens.is_empty() {
                return Err(meta.error("guard token list must not be empty"));
            }
            guard = Some(GuardAttr {
                facet,
                tokens,
                any_of: false,
            });
            Ok(())
        })?;
    }

    let handler = handler.ok_or_else(|| {
        syn::Error::new_spanned(
            &variant.ident,
            format!(
                "Missing #[tollgate(handler = path::to::handler)] attribute on variant {}",
                variant.ident
            ),
        )
    })?;

    match (&mut guard, any_of) {
        (Some(guard), true) => guard.any_of = true,
        (None, true) => {
            return Err(syn::Error::new_spanned(
                &variant.ident,
                "`any_of` requires `roles` or `authorities`",
            ))
        }
        _ => {}
    }

    let fields = match &variant.fields {
        Fields::Unit => Vec::new(),
        Fields::Unnamed(unnamed) => unnamed.unnamed.iter().map(|f| f.ty.clone()).collect(),
        Fields::Named(_) => {
            return Err(syn::Error::new_spanned(
                &variant.ident,
                "Named fields are not supported in GuardedRouter. Use tuple variants or unit variants.",
            ))
        }
    };

    Ok(Route {
        variant: variant.ident.clone(),
        handler,
        fields,
        guard,
    })
}

fn wildcard_pattern(enum_name: &syn::Ident, route: &Route) -> TokenStream2 {
    let variant = &route.variant;
    if route.fields.is_empty() {
        quote!(#enum_name::#variant)
    } else {
        quote!(#enum_name::#variant(..))
    }
}

fn guard_config_expr(guard: Option<&GuardAttr>) -> TokenStream2 {
    match guard {
        None => quote!(::core::option::Option::None),
        Some(guard) => {
            let facet = guard.facet;
            let tokens = &guard.tokens;
            let any_of = guard.any_of.then(|| quote!(.any_of()));
            quote! {
                ::core::option::Option::Some(
                    ::tollgate::GuardConfig::new(#facet, [#(#tokens),*])#any_of
                )
            }
        }
    }
}

/// `handler(Type1, Type2)`, named after the handler's last path segment.
fn signature_string(route: &Route) -> String {
    let name = route
        .handler
        .segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default();
    let params: Vec<String> = route
        .fields
        .iter()
        .map(|ty| compact_type(&ty.to_token_stream().to_string()))
        .collect();
    format!("{}({})", name, params.join(", "))
}

// Token streams print as "Vec < String >"; keep spaces only between words
fn compact_type(spaced: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '\'';
    let chars: Vec<char> = spaced.chars().collect();
    let mut out = String::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            match (prev, next) {
                (Some(',' | ';'), _) => out.push(' '),
                (Some(p), Some(n)) if is_word(p) && is_word(n) => out.push(' '),
                _ => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
