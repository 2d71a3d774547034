//! The aircraft configuration: owns the uid registry, the profile library,
//! the geometry kernel and every top-level component.

mod settings;
mod uid;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::components::{
    ComponentKind, Fuselage, FuselageProfile, GeometricComponent, Wing, WingProfile,
};
use crate::error::{EngineError, EngineResult, check_index};
use crate::geom::{GeometryKernel, MeshKernel};
use crate::parse::{DocumentBackend, XmlDocument};

pub use settings::EngineSettings;
pub use uid::{ComponentRef, Owner, UidRegistry};

pub(crate) const MODEL_PATH: &str = "/cpacs/vehicles/aircraft/model";
const WING_PROFILES_PATH: &str = "/cpacs/vehicles/profiles/wingAirfoils";
const FUSELAGE_PROFILES_PATH: &str = "/cpacs/vehicles/profiles/fuselageProfiles";

/// State threaded through every `read` call.
pub struct ReadContext<'a> {
    pub registry: &'a mut UidRegistry,
    pub profiles: &'a ProfileLibrary,
    pub kernel: &'a Arc<dyn GeometryKernel>,
    pub settings: &'a EngineSettings,
}

/// Profiles by uid, shared by every connection that references them.
#[derive(Debug, Clone, Default)]
pub struct ProfileLibrary {
    wing: BTreeMap<String, Arc<WingProfile>>,
    fuselage: BTreeMap<String, Arc<FuselageProfile>>,
}

impl ProfileLibrary {
    pub fn insert_wing_profile(&mut self, profile: WingProfile) {
        self.wing.insert(profile.uid().to_owned(), Arc::new(profile));
    }

    pub fn insert_fuselage_profile(&mut self, profile: FuselageProfile) {
        self.fuselage.insert(profile.uid().to_owned(), Arc::new(profile));
    }

    pub fn wing_profile(&self, uid: &str) -> EngineResult<Arc<WingProfile>> {
        self.wing.get(uid).cloned().ok_or_else(|| EngineError::unresolved(uid))
    }

    pub fn fuselage_profile(&self, uid: &str) -> EngineResult<Arc<FuselageProfile>> {
        self.fuselage.get(uid).cloned().ok_or_else(|| EngineError::unresolved(uid))
    }

    pub fn wing_profiles(&self) -> impl Iterator<Item = &WingProfile> + '_ {
        self.wing.values().map(AsRef::as_ref)
    }

    pub fn fuselage_profiles(&self) -> impl Iterator<Item = &FuselageProfile> + '_ {
        self.fuselage.values().map(AsRef::as_ref)
    }

    fn read(ctx: &mut ReadContext<'_>, doc: &dyn DocumentBackend) -> EngineResult<Self> {
        let mut library = Self::default();
        for i in 1..=doc.named_child_count(WING_PROFILES_PATH, "wingAirfoil") {
            let path = format!("{WING_PROFILES_PATH}/wingAirfoil[{i}]");
            library.insert_wing_profile(WingProfile::read(ctx, doc, &path)?);
        }
        for i in 1..=doc.named_child_count(FUSELAGE_PROFILES_PATH, "fuselageProfile") {
            let path = format!("{FUSELAGE_PROFILES_PATH}/fuselageProfile[{i}]");
            library.insert_fuselage_profile(FuselageProfile::read(ctx, doc, &path)?);
        }
        log::debug!(
            "read {} wing and {} fuselage profiles",
            library.wing.len(),
            library.fuselage.len()
        );
        Ok(library)
    }

    fn write(&self, doc: &mut dyn DocumentBackend) -> EngineResult<()> {
        for (i, profile) in self.wing.values().enumerate() {
            profile.write(doc, &format!("{WING_PROFILES_PATH}/wingAirfoil[{}]", i + 1))?;
        }
        for (i, profile) in self.fuselage.values().enumerate() {
            profile.write(doc, &format!("{FUSELAGE_PROFILES_PATH}/fuselageProfile[{}]", i + 1))?;
        }
        Ok(())
    }
}

/// One aircraft model read from a document.
#[derive(Debug)]
pub struct Configuration {
    uid: String,
    name: String,
    registry: UidRegistry,
    profiles: ProfileLibrary,
    wings: Vec<Wing>,
    fuselages: Vec<Fuselage>,
    kernel: Arc<dyn GeometryKernel>,
    settings: EngineSettings,
}

impl Configuration {
    /// Reads the model below `/cpacs/vehicles/aircraft/model` and brings
    /// every component up to date.
    pub fn read(
        doc: &dyn DocumentBackend,
        kernel: Arc<dyn GeometryKernel>,
        settings: EngineSettings,
    ) -> EngineResult<Self> {
        let mut registry = UidRegistry::new();
        let uid = doc.attribute(MODEL_PATH, "uID")?;
        registry.add_uid(&uid, ComponentRef::Model)?;
        let name = doc.optional_text(&format!("{MODEL_PATH}/name")).unwrap_or_default();

        let no_profiles = ProfileLibrary::default();
        let profiles = ProfileLibrary::read(
            &mut ReadContext {
                registry: &mut registry,
                profiles: &no_profiles,
                kernel: &kernel,
                settings: &settings,
            },
            doc,
        )?;

        let mut ctx = ReadContext {
            registry: &mut registry,
            profiles: &profiles,
            kernel: &kernel,
            settings: &settings,
        };
        let wings_path = format!("{MODEL_PATH}/wings");
        let wings = (1..=doc.named_child_count(&wings_path, "wing"))
            .map(|i| Wing::read(&mut ctx, doc, &format!("{wings_path}/wing[{i}]"), i - 1))
            .collect::<EngineResult<Vec<_>>>()?;
        let fuselages_path = format!("{MODEL_PATH}/fuselages");
        let fuselages = (1..=doc.named_child_count(&fuselages_path, "fuselage"))
            .map(|i| Fuselage::read(&mut ctx, doc, &format!("{fuselages_path}/fuselage[{i}]"), i - 1))
            .collect::<EngineResult<Vec<_>>>()?;

        let mut configuration = Self {
            uid,
            name,
            registry,
            profiles,
            wings,
            fuselages,
            kernel,
            settings,
        };
        configuration.update()?;
        log::debug!(
            "configuration `{}`: {} wings, {} fuselages, {} uids",
            configuration.uid,
            configuration.wings.len(),
            configuration.fuselages.len(),
            configuration.registry.len()
        );
        Ok(configuration)
    }

    /// Reads XML text with a [`MeshKernel`] built from `settings`.
    pub fn from_xml_str(input: &str, settings: EngineSettings) -> EngineResult<Self> {
        let doc = XmlDocument::parse_str(input)?;
        Self::read(&doc, Arc::new(MeshKernel::new(settings.kernel)), settings)
    }

    pub fn from_file(path: impl AsRef<Path>, settings: EngineSettings) -> EngineResult<Self> {
        let doc = XmlDocument::from_file(path)?;
        Self::read(&doc, Arc::new(MeshKernel::new(settings.kernel)), settings)
    }

    /// Writes the model back, creating missing elements.
    pub fn write(&self, doc: &mut dyn DocumentBackend) -> EngineResult<()> {
        doc.set_attribute(MODEL_PATH, "uID", &self.uid)?;
        doc.set_text(&format!("{MODEL_PATH}/name"), &self.name)?;
        self.profiles.write(doc)?;
        for (i, wing) in self.wings.iter().enumerate() {
            wing.write(doc, &format!("{MODEL_PATH}/wings/wing[{}]", i + 1))?;
        }
        for (i, fuselage) in self.fuselages.iter().enumerate() {
            fuselage.write(doc, &format!("{MODEL_PATH}/fuselages/fuselage[{}]", i + 1))?;
        }
        Ok(())
    }

    /// Serializes the model into a fresh `cpacs` document.
    pub fn to_xml_string(&self) -> EngineResult<String> {
        let mut doc = XmlDocument::with_root("cpacs");
        self.write(&mut doc)?;
        Ok(doc.to_xml_string()?)
    }

    /// Brings every component up to date.
    pub fn update(&mut self) -> EngineResult<()> {
        for wing in &mut self.wings {
            wing.update()?;
        }
        for fuselage in &mut self.fuselages {
            fuselage.update()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn registry(&self) -> &UidRegistry {
        &self.registry
    }

    #[must_use]
    pub fn profiles(&self) -> &ProfileLibrary {
        &self.profiles
    }

    #[must_use]
    pub fn kernel(&self) -> &Arc<dyn GeometryKernel> {
        &self.kernel
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn wing_count(&self) -> usize {
        self.wings.len()
    }

    /// 1-based wing access.
    pub fn wing(&self, index: usize) -> EngineResult<&Wing> {
        let i = check_index("wing", index, self.wings.len())?;
        Ok(&self.wings[i])
    }

    pub fn wing_mut(&mut self, index: usize) -> EngineResult<&mut Wing> {
        let i = check_index("wing", index, self.wings.len())?;
        Ok(&mut self.wings[i])
    }

    pub fn wing_by_uid(&self, uid: &str) -> EngineResult<&Wing> {
        match self.registry.resolve_kind(uid, ComponentKind::Wing)? {
            ComponentRef::Wing(i) => Ok(&self.wings[i]),
            _ => Err(EngineError::unresolved(uid)),
        }
    }

    pub fn wing_by_uid_mut(&mut self, uid: &str) -> EngineResult<&mut Wing> {
        match self.registry.resolve_kind(uid, ComponentKind::Wing)? {
            ComponentRef::Wing(i) => Ok(&mut self.wings[i]),
            _ => Err(EngineError::unresolved(uid)),
        }
    }

    pub fn wings(&self) -> impl Iterator<Item = &Wing> + '_ {
        self.wings.iter()
    }

    #[must_use]
    pub fn fuselage_count(&self) -> usize {
        self.fuselages.len()
    }

    pub fn fuselage(&self, index: usize) -> EngineResult<&Fuselage> {
        let i = check_index("fuselage", index, self.fuselages.len())?;
        Ok(&self.fuselages[i])
    }

    pub fn fuselage_mut(&mut self, index: usize) -> EngineResult<&mut Fuselage> {
        let i = check_index("fuselage", index, self.fuselages.len())?;
        Ok(&mut self.fuselages[i])
    }

    pub fn fuselage_by_uid(&self, uid: &str) -> EngineResult<&Fuselage> {
        match self.registry.resolve_kind(uid, ComponentKind::Fuselage)? {
            ComponentRef::Fuselage(i) => Ok(&self.fuselages[i]),
            _ => Err(EngineError::unresolved(uid)),
        }
    }

    pub fn fuselages(&self) -> impl Iterator<Item = &Fuselage> + '_ {
        self.fuselages.iter()
    }

    /// Looks up any shape-owning component by uid.
    pub fn geometric_component(&self, uid: &str) -> EngineResult<&dyn GeometricComponent> {
        let component = self.registry.resolve(uid)?;
        match component {
            ComponentRef::Wing(i) => Ok(&self.wings[i]),
            ComponentRef::Fuselage(i) => Ok(&self.fuselages[i]),
            ComponentRef::Segment {
                owner: Owner::Wing(w),
                index,
            } => Ok(self.wings[w].segment(index + 1)?),
            ComponentRef::Segment {
                owner: Owner::Fuselage(f),
                index,
            } => Ok(self.fuselages[f].segment(index + 1)?),
            other => Err(EngineError::configuration(format!(
                "uid `{uid}` names a {}, which has no shape",
                other.kind()
            ))),
        }
    }
}
