//! Persistence port for paper portfolios.

use crate::domain::error::FxlabError;
use crate::domain::portfolio::Portfolio;

pub trait PortfolioStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Portfolio>, FxlabError>;
    fn save(&self, portfolio: &Portfolio) -> Result<(), FxlabError>;

    /// Run `update` with exclusive access to the stored state. A load and
    /// save inside `update` cannot interleave with another writer's.
    ///
    /// The default takes no lock, for stores with a single owner.
    fn with_exclusive(
        &self,
        update: &mut dyn FnMut() -> Result<(), FxlabError>,
    ) -> Result<(), FxlabError> {
        update()
    }
}
