use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::remote::stub::StubApi`, the in-memory election API the client's
/// server talks to. Both share state, so a test can drive the portal through
/// the client and then inspect what reached the API.
///
/// Pass `voter` to start on an unlocked ballot page for the example election,
/// or `admin` to start with an open dashboard session.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Open a voter or admin session if needed.
    let maybe_login = parse_macro_input!(args as Option<Ident>)
        .and_then(|arg| {
            if arg == "admin" {
                Some(quote! {
                    rocket_client
                        .get("/dashboard/elections")
                        .dispatch()
                        .await;
                })
            } else if arg == "voter" {
                Some(quote! {
                    let slug = crate::model::election::examples::EXAMPLE_SLUG;

                    rocket_client
                        .get(format!("/vote/{slug}"))
                        .dispatch()
                        .await;

                    rocket_client
                        .post(format!("/vote/{slug}/token"))
                        .header(rocket::http::ContentType::JSON)
                        .body(rocket::serde::json::json!({ "token": crate::remote::stub::VALID_TOKEN }).to_string())
                        .dispatch()
                        .await;
                })
            } else {
                None
            }
        })
        .unwrap_or_default();

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, crate::remote::stub::StubApi) {
                log4rs_test_utils::test_logging::init_logging_once_for(
                    ["ballot_portal"],
                    None,
                    None,
                );

                let stub_api = crate::remote::stub::StubApi::seeded();
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::rocket_for_api(stub_api.clone()))
                    .await
                    .unwrap();

                #maybe_login

                (rocket_client, stub_api)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async move {
                #[allow(unused_variables)]
                let (rocket_client, stub_api) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_api = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        if type_ident == "Client" {
                            if has_client {
                                return Err(syn::Error::new(input.span(), "Test cannot accept more than one `rocket::local::asynchronous::Client`"));
                            }
                            has_client = true;
                            args.push(quote! { rocket_client });
                            continue;
                        } else if type_ident == "StubApi" {
                            if has_api {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `StubApi`",
                                ));
                            }
                            has_api = true;
                            args.push(quote! { stub_api.clone() });
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `api_ident: StubApi`",
        ));
    }

    Ok(args)
}
