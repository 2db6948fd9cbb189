//! Image bundle reconciler

use super::{ManagerResult, Reconciler};
use crate::error::ControllerError;
use crate::facts::FactScope;
use cvp_client::{fetch_all_concurrently, Image};
use cvp_state::{DesiredState, ImageBundleSpec, ResourceState};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

pub const MANAGER: &str = "image_bundles";

impl Reconciler {
    pub async fn reconcile_image_bundles(&self, state: &DesiredState) -> Result<ManagerResult, ControllerError> {
        info!("Reconciling {} image bundles", state.image_bundles.len());
        match state.state {
            ResourceState::Absent => self.remove_image_bundles(state).await,
            _ => self.apply_image_bundles(state).await,
        }
    }

    async fn apply_image_bundles(&self, state: &DesiredState) -> Result<ManagerResult, ControllerError> {
        let facts = self.facts(&[FactScope::Images]).await?;
        let mut result = ManagerResult::new(MANAGER);
        let mut images = fetch_all_concurrently(
            |start, end| self.client.get_images_page(start, end),
            self.options.workers,
        )
        .await?;

        for spec in &state.image_bundles {
            self.upload_images(spec, &mut images, &mut result).await?;

            let names = spec.image_names();
            let bundle_images = resolve_images(&images, &names, self.options.dry_run)?;

            match facts.image_bundle(&spec.name) {
                Some(existing) => {
                    let current = facts.images.get(&spec.name).cloned().unwrap_or_default();
                    let same_images =
                        current.iter().collect::<BTreeSet<_>>() == names.iter().collect::<BTreeSet<_>>();
                    if same_images && existing.is_certified == spec.certified {
                        debug!("Image bundle {} is up to date", spec.name);
                        continue;
                    }
                    if self.options.dry_run {
                        info!("[dry run] Would update image bundle {}", spec.name);
                    } else {
                        self.client
                            .update_image_bundle(existing, &bundle_images, spec.certified)
                            .await?;
                        info!("Updated image bundle {} ({} images)", spec.name, names.len());
                    }
                    result.diff.insert(
                        spec.name.clone(),
                        format!("- {}\n+ {}\n", current.join(", "), names.join(", ")),
                    );
                    result.record(spec.name.clone());
                }
                None => {
                    if self.options.dry_run {
                        info!("[dry run] Would create image bundle {}", spec.name);
                    } else {
                        self.client
                            .add_image_bundle(&spec.name, &bundle_images, spec.certified)
                            .await?;
                        info!("Created image bundle {} ({} images)", spec.name, names.len());
                    }
                    result.record(spec.name.clone());
                }
            }
        }

        Ok(result)
    }

    /// Upload local images the bundle needs that CVP does not have yet
    async fn upload_images(
        &self,
        spec: &ImageBundleSpec,
        images: &mut Vec<Image>,
        result: &mut ManagerResult,
    ) -> Result<(), ControllerError> {
        for upload in &spec.uploads {
            let path = Path::new(upload);
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                return Err(ControllerError::InvalidConfig(format!(
                    "Image upload path {} has no file name",
                    upload
                )));
            };
            if images.iter().any(|i| i.name == file_name) {
                debug!("Image {} already uploaded", file_name);
                continue;
            }

            if self.options.dry_run {
                info!("[dry run] Would upload image {}", upload);
            } else {
                let image = self.client.upload_image(path).await?;
                info!("Uploaded image {} ({} bytes)", image.name, image.image_size);
                images.push(image);
            }
            result.record(format!("upload:{}", file_name));
        }
        Ok(())
    }

    async fn remove_image_bundles(&self, state: &DesiredState) -> Result<ManagerResult, ControllerError> {
        let facts = self.facts(&[FactScope::Images, FactScope::Devices]).await?;
        let mut result = ManagerResult::new(MANAGER);

        for spec in &state.image_bundles {
            let Some(existing) = facts.image_bundle(&spec.name) else {
                debug!("Image bundle {} already absent", spec.name);
                continue;
            };

            let users: Vec<&str> = facts
                .devices
                .iter()
                .filter(|d| d.image_bundle.as_deref() == Some(spec.name.as_str()))
                .map(|d| d.hostname.as_str())
                .collect();
            if !users.is_empty() {
                let msg = format!(
                    "Image bundle {} is still applied to {}; not deleted",
                    spec.name,
                    users.join(", ")
                );
                warn!("{}", msg);
                result.message(msg);
                continue;
            }

            if self.options.dry_run {
                info!("[dry run] Would delete image bundle {}", spec.name);
            } else {
                self.client.delete_image_bundle(existing).await?;
                info!("Deleted image bundle {}", spec.name);
            }
            result.record(spec.name.clone());
        }

        Ok(result)
    }
}

/// Image objects for `names`; a dry run tolerates images not uploaded yet
fn resolve_images(images: &[Image], names: &[String], dry_run: bool) -> Result<Vec<Image>, ControllerError> {
    names
        .iter()
        .map(|name| match images.iter().find(|i| &i.name == name) {
            Some(image) => Ok(image.clone()),
            None if dry_run => Ok(Image {
                name: name.clone(),
                ..Default::default()
            }),
            None => Err(ControllerError::ImageNotFound(name.clone())),
        })
        .collect()
}
