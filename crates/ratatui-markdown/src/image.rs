//! Image collaborator: fetching, decoding and painting live outside this crate.

/// Opaque reference to an image an [`ImageTransformer`] has made available.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    pub id: u64,
    pub url: String,
}

/// Resolves image URLs to handles the host can paint.
///
/// Layout asks again on every pass; returning `None` keeps a one-line placeholder in place, so
/// an implementation fetching in the background simply starts returning a handle once it has
/// one.
pub trait ImageTransformer {
    fn transform(&self, url: &str) -> Option<ImageHandle>;

    /// `(columns, rows)` the image occupies once available.
    fn intrinsic_size(&self, handle: &ImageHandle) -> (u16, u16);
}

/// Never has an image; every image renders as its alt text placeholder.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoImages;

impl ImageTransformer for NoImages {
    fn transform(&self, _url: &str) -> Option<ImageHandle> {
        None
    }

    fn intrinsic_size(&self, _handle: &ImageHandle) -> (u16, u16) {
        (0, 0)
    }
}
