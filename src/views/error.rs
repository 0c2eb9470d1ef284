use rocket::http::Status;
use rocket::response::Responder;
use rocket::Request;

use rocket_contrib::templates::Template;

use serde::Serialize;

use crate::error::ErrorBody;
use crate::views::{Context, PageInfo};
use crate::Error;

/// A page shown when a request to an HTML page fails.
#[derive(Debug, Serialize)]
pub struct ErrorPage {
    pub page_info: PageInfo,
    /// The status code, e.g. 404.
    pub code: u16,
    /// The reason for the status code, e.g. "Not Found".
    pub reason: &'static str,
    pub message: String,
    #[serde(skip)]
    error: Error,
}

impl ErrorPage {
    pub fn new(err: Error, context: &Context) -> ErrorPage {
        let status = err.status();

        ErrorPage {
            page_info: PageInfo::new(status.reason, context),
            code: status.code,
            reason: status.reason,
            message: ErrorBody::from_error(&err).message,
            error: err,
        }
    }

    pub fn status(&self) -> Status {
        Status::from_code(self.code).unwrap_or(Status::InternalServerError)
    }
}

impl<'r> Responder<'r> for ErrorPage {
    fn respond_to(self, req: &Request) -> rocket::response::Result<'r> {
        self.error.log();

        let status = self.status();
        let data = serde_json::value::to_value(&self).map_err(|_| Status::InternalServerError)?;

        let mut res = Template::render("pages/error", data).respond_to(req)?;
        res.set_status(status);

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        Context {
            site_name: "agora".into(),
            session: None,
            notice: None,
        }
    }

    #[test]
    fn status_follows_the_error() {
        let page = ErrorPage::new(
            Error::CommunityNotFound {
                slug: "nope".into(),
            },
            &context(),
        );

        assert_eq!(page.status(), Status::NotFound);
        assert_eq!(page.reason, "Not Found");
        assert_eq!(page.message, "Community 'nope' not found");
    }

    #[test]
    fn internal_details_are_hidden() {
        let page = ErrorPage::new(
            Error::from(diesel::result::Error::RollbackTransaction),
            &context(),
        );

        assert_eq!(page.code, 500);
        assert_eq!(page.message, "Internal server error");
    }

    #[test]
    fn the_error_is_not_serialized() -> crate::Result<()> {
        let page = ErrorPage::new(Error::NotAuthenticated, &context());
        let value = serde_json::to_value(&page)?;

        assert_eq!(value["code"], 401);
        assert!(value.get("error").is_none());

        Ok(())
    }
}
