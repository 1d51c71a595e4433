use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tagchat_core::error::MatchmakingError;
use tagchat_core::traits::MatchmakingApi;
use tagchat_core::{PeerId, Tag};

/// In-memory matchmaking server with a scripted partner.
pub struct MockMatchmaker {
    tags: Vec<Tag>,
    partner: RefCell<Option<PeerId>>,
    fail_find: Cell<bool>,
    tag_requests: Cell<usize>,
    find_requests: RefCell<Vec<(PeerId, Vec<Tag>)>>,
}

impl MockMatchmaker {
    pub fn new(tags: &[&str]) -> Rc<Self> {
        Rc::new(Self {
            tags: tags.iter().map(|t| Tag::from(*t)).collect(),
            partner: RefCell::new(None),
            fail_find: Cell::new(false),
            tag_requests: Cell::new(0),
            find_requests: RefCell::new(Vec::new()),
        })
    }

    pub fn set_partner(&self, partner: Option<&str>) {
        *self.partner.borrow_mut() = partner.map(PeerId::from);
    }

    pub fn set_fail_find(&self, fail: bool) {
        self.fail_find.set(fail);
    }

    pub fn tag_requests(&self) -> usize {
        self.tag_requests.get()
    }

    pub fn find_requests(&self) -> Vec<(PeerId, Vec<Tag>)> {
        self.find_requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl MatchmakingApi for MockMatchmaker {
    async fn fetch_tags(&self) -> Result<Vec<Tag>, MatchmakingError> {
        self.tag_requests.set(self.tag_requests.get() + 1);
        tokio::task::yield_now().await;
        Ok(self.tags.clone())
    }

    async fn find_partner(
        &self,
        own_id: &PeerId,
        tags: &[Tag],
    ) -> Result<Option<PeerId>, MatchmakingError> {
        self.find_requests
            .borrow_mut()
            .push((own_id.clone(), tags.to_vec()));
        tokio::task::yield_now().await;

        if self.fail_find.get() {
            return Err(MatchmakingError::Network("connection refused".into()));
        }
        Ok(self.partner.borrow().clone())
    }
}
