//! The `Linker` façade: the programmatic surface with an ordered
//! usage contract (`add-input`, `link`, `add-strtab`, `shuffle-syms`,
//! `write`).

use std::rc::Rc;

use indexmap::IndexMap;

use ctfc_archive::CtfArchiveWriter;
use ctfc_model::{ArchiveMember, ArchiveSource, ArchiveWriter, Container, LinkError, Result, CTF_MAIN};
use ctfc_util::StringInterner;

use crate::merge::{self, ShareMode};
use crate::strtab;
use crate::typemap::TypeMapIndex;

/// Drives one link from a caller-owned shared output container through
/// merge, string interning, and archive emission.
///
/// Registered input archives are owned by the linker from the moment
/// they're added; the shared output stays caller-reachable
/// via [`Linker::shared`]/[`Linker::shared_mut`] throughout.
pub struct Linker {
    interner: Rc<StringInterner>,
    shared: Container,
    inputs: IndexMap<String, Box<dyn ArchiveSource>>,
    outputs: IndexMap<String, Container>,
    typemap: TypeMapIndex,
    linked: bool,
}

impl Linker {
    pub fn new(interner: Rc<StringInterner>) -> Self {
        let shared = Container::new(interner.clone());
        Linker {
            interner,
            shared,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            typemap: TypeMapIndex::new(),
            linked: false,
        }
    }

    pub fn shared(&self) -> &Container {
        &self.shared
    }

    pub fn shared_mut(&mut self) -> &mut Container {
        &mut self.shared
    }

    pub fn outputs(&self) -> &IndexMap<String, Container> {
        &self.outputs
    }

    /// Register an input archive under a unique name. Rejected once any
    /// per-CU output container exists.
    pub fn add_input(&mut self, name: impl Into<String>, archive: Box<dyn ArchiveSource>) -> Result<()> {
        if !self.outputs.is_empty() {
            return Err(LinkError::LateAdd { container: "shared".to_string() });
        }
        self.inputs.insert(name.into(), archive);
        Ok(())
    }

    /// Run the merger across every registered input.
    pub fn link(&mut self, mode: ShareMode) -> Result<()> {
        if mode == ShareMode::Duplicated {
            return Err(LinkError::NotYetImplemented("share-duplicated mode".to_string()));
        }
        tracing::debug!(inputs = self.inputs.len(), ?mode, "linking registered inputs");
        for (name, archive) in &self.inputs {
            merge::link_archive(
                &mut self.shared,
                &mut self.outputs,
                &mut self.typemap,
                &self.interner,
                name,
                archive.as_ref(),
                mode,
            )?;
        }
        self.linked = true;
        Ok(())
    }

    /// Intern external strings into every output. May be
    /// called before or after [`Linker::link`]; per-CU outputs created
    /// after this call still need it invoked again before [`Linker::write`]
    /// (or called again) to see strings added so far, matching the
    /// "must be invoked before emission" contract.
    pub fn add_strtab(&mut self, producer: impl IntoIterator<Item = (String, u32)>) {
        for (content, offset) in producer {
            strtab::add_external_string(&mut self.shared, self.outputs.values_mut(), &content, offset);
        }
    }

    /// Reserved; currently a no-op returning ok.
    pub fn shuffle_syms(&mut self) -> Result<()> {
        Ok(())
    }

    /// Finalize every output container and emit the archive buffer
    pub fn write(&mut self, compression_threshold: usize) -> Result<Vec<u8>> {
        self.shared.update()?;
        for output in self.outputs.values_mut() {
            output.update()?;
        }

        let mut archive = Box::new(CtfArchiveWriter::new(compression_threshold));
        archive.add_member(ArchiveMember::new(CTF_MAIN, ctfc_archive::encode_container(&self.shared)))?;
        for (arcname, output) in &self.outputs {
            archive.add_member(ArchiveMember::new(arcname.clone(), ctfc_archive::encode_container(output)))?;
        }
        archive.finish()
    }
}
