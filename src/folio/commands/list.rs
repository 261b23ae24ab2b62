use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::reconcile::Reconciler;
use crate::store::LocalStore;

/// Known documents, most recently read first.
pub fn run<S: LocalStore, R: IdentityResolver>(engine: &mut Reconciler<S, R>) -> Result<CmdResult> {
    let documents = engine.list_documents()?;
    let mut result = CmdResult::default();
    if documents.is_empty() {
        result.add_message(CmdMessage::info("No documents have been read yet."));
    }
    Ok(result.with_documents(documents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::engine;
    use crate::model::DeviceOrientation;

    #[test]
    fn lists_most_recent_first() {
        let mut engine = engine();
        let a = engine.resolver().add_file("a.pdf");
        let b = engine.resolver().add_file("b.pdf");
        for path in [&a, &b] {
            engine.open(path, DeviceOrientation::Portrait).unwrap();
            engine.close().unwrap();
        }

        let result = run(&mut engine).unwrap();
        let locations: Vec<_> = result.documents.iter().map(|d| d.location.clone()).collect();
        assert_eq!(locations, vec![b, a]);
        assert!(result.messages.is_empty());
    }

    #[test]
    fn empty_library_says_so() {
        let mut engine = engine();
        let result = run(&mut engine).unwrap();
        assert!(result.documents.is_empty());
        assert_eq!(result.messages.len(), 1);
    }
}
