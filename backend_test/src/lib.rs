use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type,
};

/// Which stores a test runs against.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Backend {
    Memory,
    Mongo,
}

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that any test database is dropped regardless of how the test terminates.
///
/// By default the server runs over in-memory stores. `#[backend_test(mongo)]`
/// uses a freshly named MongoDB database instead; such tests are ignored
/// unless run with `--ignored` against a live server.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::store::Stores`, plus [`mongodb::Database`] and
/// `crate::model::mongodb::Coll<T>` for MongoDB tests.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    let backend = match parse_macro_input!(args as Option<Ident>) {
        None => Backend::Memory,
        Some(arg) if arg == "mongo" => Backend::Mongo,
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no arguments or `mongo`")
                .into_compile_error()
                .into();
        }
    };

    // Extract type information and reject invalid function signatures.
    let (test_args, collection_idents, collection_types) =
        match check_sig(item_fn.sig.clone(), backend) {
            Ok(args) => args,
            Err(err) => {
                return err.into_compile_error().into();
            }
        };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let (maybe_ignore, make_stores) = match backend {
        Backend::Memory => (
            quote! {},
            quote! {
                let db: Option<mongodb::Database> = None;
                let stores = crate::store::Stores::in_memory();
            },
        ),
        Backend::Mongo => (
            quote! { #[ignore = "needs a running MongoDB server"] },
            quote! {
                let database = crate::test_database().await;
                crate::model::mongodb::ensure_indexes_exist(&database)
                    .await
                    .unwrap();
                let stores = crate::store::Stores::mongo(&database);
                let db = Some(database);
            },
        ),
    };

    // Rewrite the test function.
    quote! {
        #[test]
        #maybe_ignore
        fn #name() {
            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                crate::store::Stores,
                Option<mongodb::Database>,
            ) {
                log4rs_test_utils::test_logging::init_logging_once_for(["wyr_backend"], None, None);

                #make_stores
                let rocket_client = crate::client_for_stores(&stores).await;

                (rocket_client, stores, db)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: Option<mongodb::Database>) {
                if let Some(db) = db {
                    db.drop(None).await.unwrap();
                }
            }

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (rocket_client, stores, db) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let stores_mutex = std::sync::Mutex::new(stores);
            let db_mutex = std::sync::Mutex::new(db.clone());
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                #[allow(unused_variables)]
                let rocket_client = client_mutex.into_inner().unwrap();
                #[allow(unused_variables)]
                let stores = stores_mutex.into_inner().unwrap();
                #[allow(unused_variables)]
                let db = db_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                #(
                    let #collection_idents = crate::model::mongodb::Coll::<#collection_types>::from_db(
                        db.as_ref().unwrap(),
                    );
                )*

                runtime.block_on(#new_name(#(#test_args),*));
            });

            // Run the cleanup.
            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::panic_any(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject in order,
/// and reject unknown parameters.
#[allow(clippy::type_complexity)]
fn check_sig(
    sig: Signature,
    backend: Backend,
) -> Result<(Vec<TokenStream2>, Vec<Ident>, Vec<Ident>), syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_stores = false;
    let mut has_db = false;
    let mut args = vec![];
    let mut collection_idents = vec![];
    let mut collection_types = vec![];

    let needs_mongo = |input: &FnArg, what: &str| {
        if backend == Backend::Mongo {
            Ok(())
        } else {
            Err(syn::Error::new(
                input.span(),
                format!("`{what}` is only available in `#[backend_test(mongo)]`"),
            ))
        }
    };

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(pat_ident) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        if type_ident == "Client" {
                            if has_client {
                                return Err(syn::Error::new(input.span(), "Test cannot accept more than one `rocket::local::asynchronous::Client`"));
                            }
                            has_client = true;
                            args.push(quote! { rocket_client });
                            continue;
                        } else if type_ident == "Stores" {
                            if has_stores {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `Stores`",
                                ));
                            }
                            has_stores = true;
                            args.push(quote! { stores.clone() });
                            continue;
                        } else if type_ident == "Database" {
                            needs_mongo(input, "Database")?;
                            if has_db {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `mongodb::Database`",
                                ));
                            }
                            has_db = true;
                            args.push(quote! { db.clone().unwrap() });
                            continue;
                        }
                    } else {
                        // Valid as the last path segment for any type is itself
                        let possible_collection = type_path.path.segments.last().unwrap();
                        if possible_collection.ident == "Coll" {
                            if let PathArguments::AngleBracketed(generics) =
                                &possible_collection.arguments
                            {
                                if let Some(GenericArgument::Type(Type::Path(type_path))) =
                                    generics.args.first()
                                {
                                    if let Some(type_ident) = type_path.path.get_ident() {
                                        needs_mongo(input, "Coll<T>")?;
                                        let ident = pat_ident.ident.clone();
                                        args.push(quote! { #ident });
                                        collection_idents.push(ident);
                                        collection_types.push(type_ident.clone());
                                        continue;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `stores_ident: Stores`, \
            `db_ident: Database` or `collection_ident: Coll<T>`",
        ));
    }

    Ok((args, collection_idents, collection_types))
}
