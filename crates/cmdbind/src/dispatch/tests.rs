use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::{Dispatched, Dispatcher};
use crate::commands::{CommandRegistry, CommandSpec, ParameterSpec};
use crate::convert::Converter;
use crate::error::{BindingError, ConversionError, DispatchError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Image {
    name: String,
    version: Option<String>,
}

#[derive(Default)]
struct ImageConverter;

impl Converter for ImageConverter {
    type Output = Image;

    fn convert(&self, raw: &str) -> Result<Image, ConversionError> {
        let parts: Vec<&str> = raw.split(':').collect();
        match parts.as_slice() {
            [name] => Ok(Image {
                name: name.to_string(),
                version: None,
            }),
            [name, version] => Ok(Image {
                name: name.to_string(),
                version: Some(version.to_string()),
            }),
            _ => Err(ConversionError::new("Invalid image string format")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("container {0} not found")]
struct NotFound(String);

/// Caller-owned state threaded into the handlers.
#[derive(Default)]
struct Images {
    pulled: Mutex<Vec<Image>>,
}

fn dispatcher(images: Arc<Images>) -> Dispatcher {
    let mut registry = CommandRegistry::new();
    registry.converters_mut().register(ImageConverter);

    let pulled = Arc::clone(&images);
    registry
        .register(
            CommandSpec::new("pull", move |mut args| {
                let image = args.take::<Image>(0)?;
                pulled.pulled.lock().expect("images lock").push(image);
                Ok(())
            })
            .parameter(ParameterSpec::new::<Image>("image")),
        )
        .expect("register pull");
    registry
        .register(
            CommandSpec::new("stop", |args| {
                let id = args.get::<String>(0)?;
                Err(NotFound(id.clone()).into())
            })
            .parameter(ParameterSpec::new::<String>("id")),
        )
        .expect("register stop");
    Dispatcher::new(registry)
}

#[test]
fn dispatches_pull_with_converted_image() {
    let images = Arc::new(Images::default());
    let dispatcher = dispatcher(Arc::clone(&images));

    let outcome = dispatcher.dispatch_line("pull nginx:1.20").expect("dispatch");
    assert_eq!(
        outcome,
        Dispatched::Invoked {
            command: "pull".to_string()
        }
    );
    assert_eq!(
        *images.pulled.lock().expect("images lock"),
        vec![Image {
            name: "nginx".to_string(),
            version: Some("1.20".to_string()),
        }]
    );
}

#[test]
fn dispatch_argv_skips_tokenizing() {
    let images = Arc::new(Images::default());
    let dispatcher = dispatcher(Arc::clone(&images));

    dispatcher
        .dispatch_argv(&["PULL", "--image", "my image"])
        .expect("dispatch");
    let pulled = images.pulled.lock().expect("images lock");
    assert_eq!(pulled[0].name, "my image");
    assert_eq!(pulled[0].version, None);
}

#[test]
fn empty_input_is_a_no_op() {
    let dispatcher = dispatcher(Arc::default());
    assert_eq!(dispatcher.dispatch_line("   ").expect("empty"), Dispatched::Empty);
    let argv: [&str; 0] = [];
    assert_eq!(dispatcher.dispatch_argv(&argv).expect("empty"), Dispatched::Empty);
}

#[test]
fn unknown_command_is_reported() {
    let dispatcher = dispatcher(Arc::default());
    let err = dispatcher.dispatch_line("push nginx").unwrap_err();
    assert!(matches!(err, DispatchError::UnknownCommand { ref command } if command == "push"));
    assert_eq!(err.to_string(), "Command \"push\" not found.");
}

#[test]
fn binding_failures_name_the_command() {
    let images = Arc::new(Images::default());
    let dispatcher = dispatcher(Arc::clone(&images));

    let err = dispatcher.dispatch_line("pull a:b:c").unwrap_err();
    match err.binding() {
        Some(BindingError::ArgumentConversionError {
            parameter, value, ..
        }) => {
            assert_eq!(parameter, "image");
            assert_eq!(value, "a:b:c");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().starts_with("pull: invalid value 'a:b:c'"));

    let err = dispatcher.dispatch_line("pull").unwrap_err();
    assert!(matches!(
        err.binding(),
        Some(BindingError::MissingRequiredArgument { .. })
    ));
    assert!(images.pulled.lock().expect("images lock").is_empty());
}

#[test]
fn handler_errors_pass_through_untouched() {
    let dispatcher = dispatcher(Arc::default());
    let err = dispatcher.dispatch_line("stop abc123").unwrap_err();
    let DispatchError::Handler(err) = err else {
        panic!("expected handler error");
    };
    let not_found = err.downcast_ref::<NotFound>().expect("NotFound");
    assert_eq!(not_found.0, "abc123");
    assert_eq!(err.to_string(), "container abc123 not found");
}

#[test]
fn failed_dispatch_does_not_poison_later_calls() {
    let images = Arc::new(Images::default());
    let dispatcher = dispatcher(Arc::clone(&images));
    assert!(dispatcher.dispatch_line("nope").is_err());
    assert!(dispatcher.dispatch_line("pull --bogus").is_err());
    dispatcher.dispatch_line("pull redis").expect("dispatch after errors");
    assert_eq!(images.pulled.lock().expect("images lock").len(), 1);
}

fn async_dispatcher(seen: Arc<Mutex<HashSet<String>>>) -> Dispatcher {
    let mut registry = CommandRegistry::new();
    registry
        .register(
            CommandSpec::new_async("tag", move |mut args| {
                let seen = Arc::clone(&seen);
                async move {
                    let tags = args.take::<Vec<String>>(0)?;
                    futures::future::ready(()).await;
                    seen.lock().expect("seen lock").extend(tags);
                    Ok::<_, anyhow::Error>(())
                }
            })
            .parameter(ParameterSpec::array::<String>("tags").short('t')),
        )
        .expect("register tag");
    Dispatcher::new(registry)
}

#[test]
fn sync_dispatch_drives_async_handlers() {
    let seen = Arc::new(Mutex::new(HashSet::new()));
    let dispatcher = async_dispatcher(Arc::clone(&seen));
    dispatcher.dispatch_line("tag -t a -t b").expect("dispatch");
    let seen = seen.lock().expect("seen lock");
    assert!(seen.contains("a") && seen.contains("b"));
}

#[tokio::test]
async fn async_dispatch_awaits_handlers() {
    let seen = Arc::new(Mutex::new(HashSet::new()));
    let dispatcher = async_dispatcher(Arc::clone(&seen));
    let outcome = dispatcher
        .dispatch_line_async("tag x y")
        .await
        .expect("dispatch");
    assert_eq!(
        outcome,
        Dispatched::Invoked {
            command: "tag".to_string()
        }
    );
    assert_eq!(seen.lock().expect("seen lock").len(), 2);
}

#[tokio::test]
async fn async_dispatch_runs_sync_handlers() {
    let images = Arc::new(Images::default());
    let dispatcher = dispatcher(Arc::clone(&images));
    dispatcher
        .dispatch_argv_async(&["pull", "alpine:3"])
        .await
        .expect("dispatch");
    assert_eq!(images.pulled.lock().expect("images lock").len(), 1);
}

#[test]
fn dispatcher_is_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Dispatcher>();

    let images = Arc::new(Images::default());
    let dispatcher = Arc::new(dispatcher(Arc::clone(&images)));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                dispatcher
                    .dispatch_line(&format!("pull image{i}:{i}.0"))
                    .expect("dispatch");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }
    let mut names: Vec<String> = images
        .pulled
        .lock()
        .expect("images lock")
        .iter()
        .map(|image| image.name.clone())
        .collect();
    names.sort();
    assert_eq!(names, vec!["image0", "image1", "image2", "image3"]);
}

#[test]
fn case_sensitive_commands_reject_other_cases() {
    let mut registry = CommandRegistry::new();
    registry
        .register(CommandSpec::new("run", |_| Ok(())).case_sensitive(true))
        .expect("register run");
    let dispatcher = Dispatcher::from(registry);
    assert!(dispatcher.dispatch_line("run").is_ok());
    assert!(matches!(
        dispatcher.dispatch_line("RUN").unwrap_err(),
        DispatchError::UnknownCommand { .. }
    ));
}
