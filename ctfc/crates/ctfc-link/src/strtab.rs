//! External string interning: fan a host-supplied
//! `(string, offset)` stream into the shared output and every per-CU
//! output container.

use ctfc_model::Container;

/// Add one external string mapping to `shared` and every container in
/// `outputs`, marking each dirty. The caller drives the producer and
/// calls this once per `(content, offset)` pair; the engine does not
/// deduplicate the input stream, it trusts the producer's offsets.
pub fn add_external_string<'a>(
    shared: &mut Container,
    outputs: impl IntoIterator<Item = &'a mut Container>,
    content: &str,
    offset: u32,
) {
    shared.add_external_string(content, offset);
    for out in outputs {
        out.add_external_string(content, offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctfc_util::StringInterner;
    use std::rc::Rc;

    #[test]
    fn fans_out_to_shared_and_every_output() {
        let interner = Rc::new(StringInterner::new());
        let mut shared = Container::new(interner.clone());
        let mut child = Container::new_child(interner, "unit.c");

        add_external_string(&mut shared, std::iter::once(&mut child), "foo", 17);

        assert_eq!(shared.external_strings().count(), 1);
        assert_eq!(child.external_strings().count(), 1);
        assert_eq!(shared.external_strings().next().unwrap(), (17, "foo"));
    }

    #[test]
    fn overwriting_an_offset_is_idempotent() {
        let interner = Rc::new(StringInterner::new());
        let mut shared = Container::new(interner);
        add_external_string(&mut shared, std::iter::empty(), "foo", 17);
        add_external_string(&mut shared, std::iter::empty(), "foo", 17);
        assert_eq!(shared.external_strings().count(), 1);
    }
}
